//! Upload and download endpoints
//!
//! - `POST /upload` - one `file` part plus optional `filePath`, returns the public URL
//! - `POST /uploadList` - several `file` parts, returns their public URLs
//! - `GET /getUrl?objectName=` - presigned URL (PUT by default)
//! - `GET /down?objectName=` - object bytes as an attachment, or inline with `inline=true`
//! - `GET /stat?objectName=` - size, content type and last-modified time

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, info};

use crate::models::{AppState, ObjectQuery, ObjectStatResponse, UploadQuery};
use crate::storage::{PresignMethod, UploadedFile};
use crate::types::{AppError, AppQuery, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/uploadList", post(upload_list))
        .route("/getUrl", get(get_url))
        .route("/down", get(down))
        .route("/stat", get(stat))
        .with_state(state)
}

struct UploadForm {
    files: Vec<UploadedFile>,
    file_path: Option<String>,
}

async fn read_form(multipart: Result<Multipart, MultipartRejection>) -> AppResult<UploadForm> {
    let mut multipart = multipart?;
    let mut form = UploadForm {
        files: Vec::new(),
        file_path: None,
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "filePath" => form.file_path = Some(field.text().await?),
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.files.push(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => debug!(field = %name, "Ignoring unknown multipart field"),
        }
    }

    if form.files.is_empty() {
        return Err(AppError::InvalidRequest(
            "multipart field 'file' is required".to_string(),
        ));
    }
    Ok(form)
}

async fn upload(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UploadQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<String> {
    let UploadForm { files, file_path } = read_form(multipart).await?;
    if files.len() > 1 {
        return Err(AppError::InvalidRequest(
            "/upload accepts a single file, use /uploadList".to_string(),
        ));
    }
    let file_path = file_path.or(query.file_path).unwrap_or_default();
    info!(path = %file_path, "File upload request received");

    let bucket = state.storage.default_bucket().to_string();
    let names = state.storage.upload(files, &bucket, &file_path).await?;
    let name = names
        .first()
        .ok_or_else(|| AppError::Internal("upload returned no object name".to_string()))?;

    Ok(state
        .storage
        .public_url(&bucket, &format!("{}{}", file_path, name)))
}

async fn upload_list(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<Vec<String>>> {
    let form = read_form(multipart).await?;
    info!(count = form.files.len(), "Batch upload request received");

    let bucket = state.storage.default_bucket().to_string();
    let names = state.storage.upload(form.files, &bucket, "").await?;

    Ok(Json(
        names
            .iter()
            .map(|name| state.storage.public_url(&bucket, name))
            .collect(),
    ))
}

async fn get_url(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ObjectQuery>,
) -> AppResult<String> {
    let method = query
        .method
        .as_deref()
        .map(str::parse::<PresignMethod>)
        .transpose()?;

    let url = state
        .storage
        .presigned_url(&query.object_name, method, query.expires)
        .await?;
    info!(object = %query.object_name, "Presigned URL issued");
    Ok(url)
}

async fn down(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ObjectQuery>,
) -> AppResult<Response> {
    let data = state.storage.download(&query.object_name).await?;
    info!(object = %query.object_name, size = data.bytes.len(), inline = query.inline, "Serving download");

    let encoded_name = urlencoding::encode(&query.object_name);
    let (content_type, disposition) = if query.inline {
        (
            data.content_type
                .clone()
                .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string()),
            format!("inline;filename={}", encoded_name),
        )
    } else {
        (
            mime::APPLICATION_OCTET_STREAM.to_string(),
            format!("attachment;filename={}", encoded_name),
        )
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, data.bytes.len())
        .header(header::ACCESS_CONTROL_EXPOSE_HEADERS, "*")
        .body(Body::from(data.bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

async fn stat(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ObjectQuery>,
) -> AppResult<Json<ObjectStatResponse>> {
    let bucket = query
        .bucket
        .unwrap_or_else(|| state.storage.default_bucket().to_string());
    let stat = state.storage.stat(&bucket, &query.object_name).await?;

    Ok(Json(ObjectStatResponse {
        bucket,
        name: query.object_name,
        stat,
    }))
}
