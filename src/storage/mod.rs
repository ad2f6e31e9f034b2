//! Storage layer (S3-compatible)
//!
//! [`ObjectStore`] is the seam over the storage client; [`S3Client`] talks to
//! MinIO/S3 through `rust-s3`, [`MemoryStore`] keeps objects in process.
//! [`Storage`] is what the HTTP handlers use: it adds the default bucket,
//! object naming and public URL construction on top of a store.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{StorageConfig, MAX_PRESIGN_EXPIRY_SECS};
use crate::utils::{sequenced_name, timestamped_name};

pub mod memory;
pub mod s3_client;

pub use memory::MemoryStore;
pub use s3_client::S3Client;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage configuration error: {0}")]
    Config(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// HTTP method a presigned URL is signed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresignMethod {
    Get,
    #[default]
    Put,
}

impl std::str::FromStr for PresignMethod {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(PresignMethod::Get),
            "put" => Ok(PresignMethod::Put),
            other => Err(StorageError::InvalidArgument(format!(
                "unsupported presign method: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub name: String,
    pub size: u64,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObjectData {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectStat {
    pub size: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
}

/// One file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub object: String,
    pub message: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Names of every bucket visible to the credentials, sorted.
    async fn list_buckets(&self) -> StorageResult<Vec<String>>;

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    async fn make_bucket(&self, bucket: &str) -> StorageResult<()>;

    async fn remove_bucket(&self, bucket: &str) -> StorageResult<()>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectData>;

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat>;

    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Recursive listing of every object under `prefix`.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        method: PresignMethod,
        expiry_secs: u32,
    ) -> StorageResult<String>;
}

/// Builds the store selected by `config.provider`.
pub fn connect(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.provider.as_str() {
        "s3" => Ok(Arc::new(S3Client::new(config)?)),
        "memory" => Ok(Arc::new(MemoryStore::new(&config.endpoint))),
        other => Err(StorageError::Config(format!(
            "unsupported storage provider: {}",
            other
        ))),
    }
}

#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn ObjectStore>,
    endpoint: String,
    default_bucket: String,
    default_expiry_secs: u32,
}

impl Storage {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            default_bucket: config.bucket_name.clone(),
            default_expiry_secs: config.presign_expiry_secs,
        }
    }

    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    /// Creates `bucket` when the store does not have it yet.
    pub async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        if !self.store.bucket_exists(bucket).await? {
            info!(bucket = %bucket, "Creating missing bucket");
            match self.store.make_bucket(bucket).await {
                // Another request may have created it in between.
                Ok(()) | Err(StorageError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        self.store.list_buckets().await
    }

    pub async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        self.store.bucket_exists(bucket).await
    }

    pub async fn make_bucket(&self, bucket: &str) -> StorageResult<()> {
        if self.store.bucket_exists(bucket).await? {
            return Err(StorageError::AlreadyExists(format!("bucket {}", bucket)));
        }
        self.store.make_bucket(bucket).await
    }

    pub async fn remove_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.store.remove_bucket(bucket).await
    }

    /// Stores every file under `path` + a timestamped file name and returns
    /// the generated names in upload order. Names are unique within a batch.
    pub async fn upload(
        &self,
        files: Vec<UploadedFile>,
        bucket: &str,
        path: &str,
    ) -> StorageResult<Vec<String>> {
        self.ensure_bucket(bucket).await?;

        let mut names = Vec::with_capacity(files.len());
        let mut taken = HashSet::new();
        for file in files {
            let millis = chrono::Utc::now().timestamp_millis();
            let mut name = timestamped_name(&file.file_name, millis)
                .ok_or_else(|| StorageError::InvalidArgument("file name is empty".to_string()))?;
            let mut seq = 1;
            while taken.contains(&name) {
                // sequenced_name only fails where timestamped_name already did
                name = sequenced_name(&file.file_name, millis, seq).unwrap_or_default();
                seq += 1;
            }
            taken.insert(name.clone());
            let key = format!("{}{}", path, name);
            let content_type = file
                .content_type
                .filter(|ct| !ct.is_empty())
                .unwrap_or_else(|| {
                    mime_guess::from_path(&name)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string()
                });

            info!(bucket = %bucket, key = %key, size = file.bytes.len(), "Uploading object");
            self.store
                .put_object(bucket, &key, file.bytes, &content_type)
                .await?;
            names.push(name);
        }
        Ok(names)
    }

    /// `{endpoint}/{bucket}/{key}` with every key segment percent-encoded.
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        let key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}/{}", self.endpoint, bucket, key)
    }

    /// Presigned URL for `key` in the default bucket. Without overrides the
    /// URL is an upload (PUT) URL valid for the configured expiry.
    pub async fn presigned_url(
        &self,
        key: &str,
        method: Option<PresignMethod>,
        expiry_secs: Option<u32>,
    ) -> StorageResult<String> {
        if key.is_empty() {
            return Err(StorageError::InvalidArgument("objectName is required".to_string()));
        }
        let expiry = expiry_secs.unwrap_or(self.default_expiry_secs);
        if expiry == 0 || expiry > MAX_PRESIGN_EXPIRY_SECS {
            return Err(StorageError::InvalidArgument(format!(
                "expires must be between 1 and {}",
                MAX_PRESIGN_EXPIRY_SECS
            )));
        }
        self.store
            .presigned_url(&self.default_bucket, key, method.unwrap_or_default(), expiry)
            .await
    }

    pub async fn download(&self, key: &str) -> StorageResult<ObjectData> {
        if key.is_empty() {
            return Err(StorageError::InvalidArgument("objectName is required".to_string()));
        }
        self.store.get_object(&self.default_bucket, key).await
    }

    pub async fn stat(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat> {
        if key.is_empty() {
            return Err(StorageError::InvalidArgument("objectName is required".to_string()));
        }
        self.store.stat_object(bucket, key).await
    }

    pub async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        self.store.list_objects(bucket, prefix).await
    }

    /// Deletes every named object, collecting failures instead of stopping at
    /// the first one.
    pub async fn remove_objects(&self, bucket: &str, objects: &[String]) -> Vec<DeleteFailure> {
        let mut failures = Vec::new();
        for object in objects {
            if let Err(e) = self.store.remove_object(bucket, object).await {
                warn!(bucket = %bucket, object = %object, "Failed to remove object: {}", e);
                failures.push(DeleteFailure {
                    object: object.clone(),
                    message: e.to_string(),
                });
            }
        }
        failures
    }
}
