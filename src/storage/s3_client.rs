// S3/MinIO client backed by rust-s3

use async_trait::async_trait;
use bytes::Bytes;
use s3::bucket::Bucket;
use s3::bucket_ops::BucketConfiguration;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use tracing::debug;

use super::{
    ObjectData, ObjectInfo, ObjectStat, ObjectStore, PresignMethod, StorageError, StorageResult,
};
use crate::config::StorageConfig;

pub struct S3Client {
    region: Region,
    credentials: Credentials,
}

impl S3Client {
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(format!("invalid credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        Ok(Self { region, credentials })
    }

    /// MinIO serves buckets by path, not by virtual host.
    fn bucket(&self, name: &str) -> StorageResult<Box<Bucket>> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|e| StorageError::Config(e.to_string()))?;
        Ok(bucket.with_path_style())
    }
}

/// 409 covers both BucketAlreadyOwnedByYou/BucketAlreadyExists and
/// BucketNotEmpty; only the body tells them apart.
fn conflict(body: &str, subject: String) -> StorageError {
    if body.contains("BucketNotEmpty") {
        StorageError::InvalidArgument(format!("{} is not empty", subject))
    } else {
        StorageError::AlreadyExists(subject)
    }
}

fn map_err(err: S3Error, subject: String) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(subject),
        S3Error::HttpFailWithBody(409, body) => conflict(&body, subject),
        S3Error::HttpFailWithBody(code, body) => {
            StorageError::Backend(format!("{} returned HTTP {}: {}", subject, code, body))
        }
        other => StorageError::Backend(format!("{}: {}", subject, other)),
    }
}

fn map_status(code: u16, body: &str, subject: String) -> StorageResult<()> {
    match code {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(subject)),
        409 => Err(conflict(body, subject)),
        _ => Err(StorageError::Backend(format!(
            "{} returned HTTP {}: {}",
            subject, code, body
        ))),
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let response = Bucket::list_buckets(self.region.clone(), self.credentials.clone())
            .await
            .map_err(|e| map_err(e, "bucket listing".to_string()))?;
        let mut names: Vec<String> = response.bucket_names().collect();
        names.sort();
        Ok(names)
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        self.bucket(bucket)?
            .exists()
            .await
            .map_err(|e| map_err(e, format!("bucket {}", bucket)))
    }

    async fn make_bucket(&self, bucket: &str) -> StorageResult<()> {
        let response = Bucket::create_with_path_style(
            bucket,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(|e| map_err(e, format!("bucket {}", bucket)))?;

        map_status(
            response.response_code,
            &response.response_text,
            format!("bucket {}", bucket),
        )
    }

    async fn remove_bucket(&self, bucket: &str) -> StorageResult<()> {
        let code = self
            .bucket(bucket)?
            .delete()
            .await
            .map_err(|e| map_err(e, format!("bucket {}", bucket)))?;
        // delete() drops the body; a bare 409 here can only mean BucketNotEmpty
        map_status(code, "BucketNotEmpty", format!("bucket {}", bucket))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        let response = self
            .bucket(bucket)?
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(|e| map_err(e, format!("object {}/{}", bucket, key)))?;
        debug!(bucket = %bucket, key = %key, status = response.status_code(), "put_object");
        map_status(
            response.status_code(),
            "",
            format!("object {}/{}", bucket, key),
        )
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectData> {
        let response = self
            .bucket(bucket)?
            .get_object(key)
            .await
            .map_err(|e| map_err(e, format!("object {}/{}", bucket, key)))?;
        map_status(
            response.status_code(),
            "",
            format!("object {}/{}", bucket, key),
        )?;

        let content_type = response.headers().get("content-type").cloned();
        Ok(ObjectData {
            bytes: response.bytes().clone(),
            content_type,
        })
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat> {
        let (head, code) = self
            .bucket(bucket)?
            .head_object(key)
            .await
            .map_err(|e| map_err(e, format!("object {}/{}", bucket, key)))?;
        map_status(code, "", format!("object {}/{}", bucket, key))?;

        Ok(ObjectStat {
            size: head.content_length.unwrap_or_default().max(0) as u64,
            content_type: head.content_type,
            last_modified: head.last_modified,
        })
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let response = self
            .bucket(bucket)?
            .delete_object(key)
            .await
            .map_err(|e| map_err(e, format!("object {}/{}", bucket, key)))?;
        map_status(
            response.status_code(),
            "",
            format!("object {}/{}", bucket, key),
        )
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let pages = self
            .bucket(bucket)?
            .list(prefix.to_string(), None)
            .await
            .map_err(|e| map_err(e, format!("bucket {}", bucket)))?;

        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| ObjectInfo {
                name: object.key,
                size: object.size,
                last_modified: Some(object.last_modified),
            })
            .collect())
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        method: PresignMethod,
        expiry_secs: u32,
    ) -> StorageResult<String> {
        let handle = self.bucket(bucket)?;
        let result = match method {
            PresignMethod::Get => handle.presign_get(key, expiry_secs, None).await,
            PresignMethod::Put => handle.presign_put(key, expiry_secs, None, None).await,
        };
        result.map_err(|e| map_err(e, format!("object {}/{}", bucket, key)))
    }
}
