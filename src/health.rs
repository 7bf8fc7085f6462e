use serde::Serialize;
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::redis::RedisClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Online,
    Offline,
}

/// Connectivity state for the two shared dependencies. Statuses are written
/// only by the monitor loop (and the initial bootstrap); everything else
/// just reads them.
#[derive(Debug, Default)]
pub struct HealthMonitor {
    postgres_online: AtomicBool,
    redis_online: AtomicBool,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn postgres_status(&self) -> DependencyStatus {
        if self.postgres_online.load(Ordering::Relaxed) {
            DependencyStatus::Online
        } else {
            DependencyStatus::Offline
        }
    }

    pub fn redis_status(&self) -> DependencyStatus {
        if self.redis_online.load(Ordering::Relaxed) {
            DependencyStatus::Online
        } else {
            DependencyStatus::Offline
        }
    }

    pub fn is_ready(&self) -> bool {
        self.postgres_online.load(Ordering::Relaxed) && self.redis_online.load(Ordering::Relaxed)
    }

    pub fn set_postgres_online(&self, online: bool) {
        self.postgres_online.store(online, Ordering::Relaxed);
    }

    pub fn set_redis_online(&self, online: bool) {
        self.redis_online.store(online, Ordering::Relaxed);
    }
}

/// Probes both dependencies on an interval and updates the shared statuses.
pub async fn run_monitor(
    monitor: std::sync::Arc<HealthMonitor>,
    db: PgPool,
    redis: std::sync::Arc<RedisClient>,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let postgres_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&db)
            .await
            .is_ok();
        if postgres_ok != (monitor.postgres_status() == DependencyStatus::Online) {
            if postgres_ok {
                tracing::info!("Postgres back online");
            } else {
                tracing::error!("Postgres offline");
            }
        }
        monitor.set_postgres_online(postgres_ok);

        let redis_ok = redis.ping().await.is_ok();
        if redis_ok != (monitor.redis_status() == DependencyStatus::Online) {
            if redis_ok {
                tracing::info!("Redis back online");
            } else {
                tracing::error!("Redis offline");
            }
        }
        monitor.set_redis_online(redis_ok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_start_offline() {
        let monitor = HealthMonitor::new();
        assert_eq!(monitor.postgres_status(), DependencyStatus::Offline);
        assert_eq!(monitor.redis_status(), DependencyStatus::Offline);
        assert!(!monitor.is_ready());
    }

    #[test]
    fn ready_requires_both_dependencies() {
        let monitor = HealthMonitor::new();
        monitor.set_postgres_online(true);
        assert!(!monitor.is_ready());
        monitor.set_redis_online(true);
        assert!(monitor.is_ready());
        monitor.set_postgres_online(false);
        assert!(!monitor.is_ready());
    }
}
