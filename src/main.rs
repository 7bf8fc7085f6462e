use share_ur_save::config::Config;
use share_ur_save::database::{create_pool, run_migrations};
use share_ur_save::health::{self, HealthMonitor};
use share_ur_save::redis::RedisClient;
use share_ur_save::services::rawg_service::RawgService;
use share_ur_save::services::storage_service::StorageService;
use share_ur_save::{AppState, create_app};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "share_ur_save=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let db = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Run migrations
    run_migrations(&db).await?;
    tracing::info!("Database migrations completed");

    // Create Redis client
    let redis = Arc::new(RedisClient::new(&config.redis_url).await?);
    tracing::info!("Redis client created");

    // Catalog client and blob storage
    let rawg = Arc::new(RawgService::new(
        &config.rawg_api_url,
        config.rawg_api_key.clone(),
    ));
    let storage = Arc::new(StorageService::new(
        &config.upload_dir,
        &config.public_base_url,
        config.max_file_size,
    ));

    // Both dependencies connected; mark them online and let the monitor
    // take over from here.
    let monitor = Arc::new(HealthMonitor::new());
    monitor.set_postgres_online(true);
    monitor.set_redis_online(true);
    tokio::spawn(health::run_monitor(
        monitor.clone(),
        db.clone(),
        redis.clone(),
        config.health_check_interval_secs,
    ));

    // Create application state
    let state = AppState {
        db,
        redis,
        config: Arc::new(config.clone()),
        rawg,
        storage,
        health: monitor,
    };

    // Create application
    let app = create_app(state);

    // Create listener
    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    tracing::info!("Server listening on {}:{}", config.host, config.port);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
