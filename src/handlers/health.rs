use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};

use crate::AppState;

/// Liveness/readiness report. Bypasses the readiness gate so probes can see
/// which dependency is down.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let postgres = state.health.postgres_status();
    let redis = state.health.redis_status();

    let status = if state.health.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "OK" } else { "UNAVAILABLE" },
            "postgres": postgres,
            "redis": redis,
        })),
    )
}
