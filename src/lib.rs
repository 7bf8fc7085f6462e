pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod health;
pub mod models;
pub mod redis;
pub mod services;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    config::Config,
    error::AppError,
    health::HealthMonitor,
    redis::RedisClient,
    services::{rawg_service::RawgService, storage_service::StorageService},
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: Arc<RedisClient>,
    pub config: Arc<Config>,
    pub rawg: Arc<RawgService>,
    pub storage: Arc<StorageService>,
    pub health: Arc<HealthMonitor>,
}

/// Rejects requests while either shared dependency is offline. The health
/// endpoint is mounted outside this gate.
async fn readiness_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.health.is_ready() {
        return AppError::ServiceUnavailable("dependency offline".to_string()).into_response();
    }
    next.run(request).await
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let api_routes = Router::new()
        // Auth routes
        .route("/auth/sign-up", post(handlers::auth::sign_up))
        .route("/auth/sign-in", post(handlers::auth::sign_in))
        .route("/auth/sign-out", post(handlers::auth::sign_out))
        .route("/auth/user", get(handlers::auth::fetch_user))
        .route(
            "/auth/user/profile-picture",
            post(handlers::auth::update_profile_picture),
        )
        // Game routes
        .route("/games", get(handlers::games::get_games))
        .route("/game/{id}", get(handlers::games::get_game))
        // Save routes
        .route(
            "/game/{game_uuid}/add-save",
            post(handlers::saves::add_save),
        )
        .route(
            "/game/{game_uuid}/get-saves",
            get(handlers::saves::get_saves),
        )
        .route("/save/{save_uuid}/upvote", post(handlers::saves::upvote))
        .route(
            "/save/{save_uuid}/downvote",
            post(handlers::saves::downvote),
        )
        .route("/save/{save_uuid}", delete(handlers::saves::delete_save))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            readiness_gate,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(api_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(DefaultBodyLimit::max(state.config.max_file_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
