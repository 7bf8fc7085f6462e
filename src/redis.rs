use crate::error::Result;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Session store backed by Redis. Entries carry no TTL; a session lives
/// until it is explicitly revoked or evicted by the store itself.
#[derive(Clone)]
pub struct RedisClient {
    manager: Arc<Mutex<ConnectionManager>>,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager: Arc::new(Mutex::new(manager)),
        })
    }

    fn session_key(token: &str) -> String {
        format!("session:{}", token)
    }

    pub async fn store_session(&self, token: &str, user_json: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let _: () = conn.set(Self::session_key(token), user_json).await?;
        Ok(())
    }

    pub async fn get_session(&self, token: &str) -> Result<Option<String>> {
        let mut conn = self.manager.lock().await;
        let value: Option<String> = conn.get(Self::session_key(token)).await?;
        Ok(value)
    }

    /// Idempotent: deleting a missing session is not an error.
    pub async fn delete_session(&self, token: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let _: () = conn.del(Self::session_key(token)).await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }
}
