// In-process object store, used by tests and `STORAGE_PROVIDER=memory`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{
    ObjectData, ObjectInfo, ObjectStat, ObjectStore, PresignMethod, StorageError, StorageResult,
};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Bytes,
    content_type: String,
    last_modified: String,
}

pub struct MemoryStore {
    endpoint: String,
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
}

impl MemoryStore {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            buckets: RwLock::new(HashMap::new()),
        }
    }
}

fn missing_bucket(bucket: &str) -> StorageError {
    StorageError::NotFound(format!("bucket {}", bucket))
}

fn missing_object(bucket: &str, key: &str) -> StorageError {
    StorageError::NotFound(format!("object {}/{}", bucket, key))
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let mut names: Vec<String> = self.buckets.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn make_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut buckets = self.buckets.write().await;
        if buckets.contains_key(bucket) {
            return Err(StorageError::AlreadyExists(format!("bucket {}", bucket)));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut buckets = self.buckets.write().await;
        let is_empty = buckets
            .get(bucket)
            .map(|objects| objects.is_empty())
            .ok_or_else(|| missing_bucket(bucket))?;
        if !is_empty {
            return Err(StorageError::InvalidArgument(format!(
                "bucket {} is not empty",
                bucket
            )));
        }
        buckets.remove(bucket);
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets.get_mut(bucket).ok_or_else(|| missing_bucket(bucket))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes: data,
                content_type: content_type.to_string(),
                last_modified: chrono::Utc::now().to_rfc3339(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectData> {
        let buckets = self.buckets.read().await;
        let object = buckets
            .get(bucket)
            .ok_or_else(|| missing_bucket(bucket))?
            .get(key)
            .ok_or_else(|| missing_object(bucket, key))?;
        Ok(ObjectData {
            bytes: object.bytes.clone(),
            content_type: Some(object.content_type.clone()),
        })
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat> {
        let buckets = self.buckets.read().await;
        let object = buckets
            .get(bucket)
            .ok_or_else(|| missing_bucket(bucket))?
            .get(key)
            .ok_or_else(|| missing_object(bucket, key))?;
        Ok(ObjectStat {
            size: object.bytes.len() as u64,
            content_type: Some(object.content_type.clone()),
            last_modified: Some(object.last_modified.clone()),
        })
    }

    /// Removing an absent key succeeds, matching S3 DeleteObject.
    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let mut buckets = self.buckets.write().await;
        buckets
            .get_mut(bucket)
            .ok_or_else(|| missing_bucket(bucket))?
            .remove(key);
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let buckets = self.buckets.read().await;
        let objects = buckets.get(bucket).ok_or_else(|| missing_bucket(bucket))?;
        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                name: key.clone(),
                size: object.bytes.len() as u64,
                last_modified: Some(object.last_modified.clone()),
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
        let method = match method {
            PresignMethod::Get => "GET",
            PresignMethod::Put => "PUT",
        };
        Ok(format!(
            "{}/{}/{}?method={}&expires={}",
            self.endpoint,
            bucket,
            urlencoding::encode(key),
            method,
            expiry_secs
        ))
    }
}
