use axum::{extract::State, routing::get, Json, Router};
use tracing::warn;

use crate::models::{AppState, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let bucket = state.storage.default_bucket();
    let storage = match state.storage.bucket_exists(bucket).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "bucket missing".to_string(),
        Err(e) => {
            warn!("Storage health check failed: {}", e);
            "unreachable".to_string()
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage,
    })
}
