//! Bucket management
//!
//! - `GET /buckets` - names of every bucket
//! - `GET /buckets/{name}` - existence check
//! - `PUT /buckets/{name}` - create (409 when it already exists)
//! - `DELETE /buckets/{name}` - remove an empty bucket

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::info;

use crate::models::{AppState, BucketStatus};
use crate::types::AppResult;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/buckets", get(list_buckets))
        .route(
            "/buckets/{name}",
            get(bucket_exists).put(make_bucket).delete(remove_bucket),
        )
        .with_state(state)
}

async fn list_buckets(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    Ok(Json(state.storage.list_buckets().await?))
}

async fn bucket_exists(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<BucketStatus>> {
    let exists = state.storage.bucket_exists(&name).await?;
    Ok(Json(BucketStatus {
        bucket: name,
        exists,
    }))
}

async fn make_bucket(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<(StatusCode, Json<BucketStatus>)> {
    state.storage.make_bucket(&name).await?;
    info!(bucket = %name, "Bucket created");
    Ok((
        StatusCode::CREATED,
        Json(BucketStatus {
            bucket: name,
            exists: true,
        }),
    ))
}

async fn remove_bucket(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    state.storage.remove_bucket(&name).await?;
    info!(bucket = %name, "Bucket removed");
    Ok(StatusCode::NO_CONTENT)
}
