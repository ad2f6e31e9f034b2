use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;

/// Longest expiry accepted by S3 signature v4 (7 days).
pub const MAX_PRESIGN_EXPIRY_SECS: u32 = 604_800;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: String,
    pub endpoint: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket_name: String,
    pub region: String,
    pub presign_expiry_secs: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so tests do not
    /// have to touch the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = StorageConfig {
            provider: get("STORAGE_PROVIDER").unwrap_or_else(|| "s3".to_string()),
            endpoint: get("MINIO_ENDPOINT")
                .unwrap_or_else(|| "http://127.0.0.1:9000".to_string())
                .trim_end_matches('/')
                .to_string(),
            access_key: get("MINIO_ACCESS_KEY"),
            secret_key: get("MINIO_SECRET_KEY"),
            bucket_name: get("MINIO_BUCKET_NAME").unwrap_or_else(|| "default".to_string()),
            region: get("MINIO_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            presign_expiry_secs: get("PRESIGN_EXPIRY_SECS")
                .unwrap_or_else(|| "3600".to_string())
                .parse()
                .context("PRESIGN_EXPIRY_SECS must be a positive integer")?,
        };
        storage.validate()?;

        Ok(Self {
            server: ServerConfig {
                port: get("PORT")
                    .unwrap_or_else(|| "8080".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                cors_allowed_origins: get("ALLOWED_ORIGINS")
                    .unwrap_or_else(|| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_upload_bytes: get("MAX_UPLOAD_BYTES")
                    .unwrap_or_else(|| (100 * 1024 * 1024).to_string())
                    .parse()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
                log_dir: get("LOG_DIR").filter(|s| !s.is_empty()),
            },
            storage,
        })
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        match self.provider.as_str() {
            "s3" => {
                if self.access_key.as_deref().unwrap_or_default().is_empty() {
                    bail!("MINIO_ACCESS_KEY must be set for the s3 storage provider");
                }
                if self.secret_key.as_deref().unwrap_or_default().is_empty() {
                    bail!("MINIO_SECRET_KEY must be set for the s3 storage provider");
                }
            }
            "memory" => {}
            other => bail!("Unsupported storage provider: {}", other),
        }

        if self.bucket_name.is_empty() {
            bail!("MINIO_BUCKET_NAME must not be empty");
        }
        if self.presign_expiry_secs == 0 || self.presign_expiry_secs > MAX_PRESIGN_EXPIRY_SECS {
            bail!(
                "PRESIGN_EXPIRY_SECS must be between 1 and {}",
                MAX_PRESIGN_EXPIRY_SECS
            );
        }
        Ok(())
    }
}
