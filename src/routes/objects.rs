//! Object listing and batch removal
//!
//! - `GET /list?bucket=&prefix=` - objects with name, size and last-modified time
//! - `POST /removeObjects` - best-effort batch delete

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use crate::models::{AppState, ListQuery, RemoveObjectsRequest, RemoveObjectsResponse};
use crate::storage::ObjectInfo;
use crate::types::{AppError, AppJson, AppQuery, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/list", get(list_objects))
        .route("/removeObjects", post(remove_objects))
        .with_state(state)
}

async fn list_objects(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<Json<Vec<ObjectInfo>>> {
    let bucket = query
        .bucket
        .unwrap_or_else(|| state.storage.default_bucket().to_string());
    let prefix = query.prefix.unwrap_or_default();

    let objects = state.storage.list(&bucket, &prefix).await?;
    info!(bucket = %bucket, prefix = %prefix, count = objects.len(), "Listed objects");
    Ok(Json(objects))
}

async fn remove_objects(
    State(state): State<AppState>,
    AppJson(request): AppJson<RemoveObjectsRequest>,
) -> AppResult<Json<RemoveObjectsResponse>> {
    if request.objects.is_empty() {
        return Err(AppError::InvalidRequest(
            "objects must not be empty".to_string(),
        ));
    }
    let bucket = request
        .bucket
        .unwrap_or_else(|| state.storage.default_bucket().to_string());

    let errors = state
        .storage
        .remove_objects(&bucket, &request.objects)
        .await;
    let removed = request.objects.len() - errors.len();
    info!(bucket = %bucket, removed, failed = errors.len(), "Batch delete finished");

    Ok(Json(RemoveObjectsResponse { removed, errors }))
}
