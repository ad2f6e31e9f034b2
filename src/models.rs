use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::storage::{DeleteFailure, ObjectStat, Storage};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Storage,
}

impl AppState {
    pub fn new(config: Config, storage: Storage) -> Self {
        Self { config, storage }
    }
}

/// Query of `/getUrl`, `/down` and `/stat`. Field names follow the public API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectQuery {
    pub object_name: String,
    pub bucket: Option<String>,
    pub expires: Option<u32>,
    pub method: Option<String>,
    /// Serve `/down` with the stored content type instead of as an attachment.
    #[serde(default)]
    pub inline: bool,
}

/// `filePath` may also arrive in the query string; a form field wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectStatResponse {
    pub bucket: String,
    pub name: String,
    #[serde(flatten)]
    pub stat: ObjectStat,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveObjectsRequest {
    pub bucket: Option<String>,
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveObjectsResponse {
    pub removed: usize,
    pub errors: Vec<DeleteFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketStatus {
    pub bucket: String,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage: String,
}
