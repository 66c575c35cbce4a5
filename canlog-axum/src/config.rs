use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use canlog_blob::BlobConfig;
use canlog_service::ServiceConfig;

/// Where staged blocks and committed objects live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Filesystem,
    S3,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "filesystem" | "fs" => Ok(Self::Filesystem),
            "s3" => Ok(Self::S3),
            other => Err(anyhow!("unknown storage backend {other:?}")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Filesystem => "filesystem",
            Self::S3 => "s3",
        })
    }
}

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backend: StorageBackend,
    /// Root directory of the filesystem backend
    pub storage_root: PathBuf,
    pub service: ServiceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            backend: StorageBackend::Memory,
            storage_root: PathBuf::from("./data"),
            service: ServiceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read `CANLOG_*` environment variables over the defaults.
    ///
    /// S3 credentials are read separately when the S3 backend is selected.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let blob_defaults = BlobConfig::default();

        let backend = match std::env::var("CANLOG_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };
        let max_chunk_mb = env_var_or(
            "CANLOG_MAX_CHUNK_MB",
            blob_defaults.max_chunk_bytes / MEBIBYTE,
        );

        let blob = BlobConfig::new()
            .with_container(env_var_or("CANLOG_CONTAINER_NAME", blob_defaults.container))
            .with_default_folder(env_var_or(
                "CANLOG_DEFAULT_FOLDER_NAME",
                blob_defaults.default_folder,
            ))
            .with_staging_dir(env_var_or(
                "CANLOG_STAGING_DIR",
                blob_defaults.staging_dir.display().to_string(),
            ))
            .with_max_chunk_bytes(mebibytes(max_chunk_mb));

        let service = ServiceConfig::new()
            .with_account_name(env_var_or(
                "CANLOG_ACCOUNT_NAME",
                defaults.service.account_name.clone(),
            ))
            .with_queue_name(env_var_or(
                "CANLOG_QUEUE_NAME",
                defaults.service.queue_name.clone(),
            ))
            .with_blob_config(blob);

        Ok(Self {
            host: env_var_or("CANLOG_HOST", defaults.host),
            port: env_var_or("CANLOG_PORT", defaults.port),
            backend,
            storage_root: PathBuf::from(env_var_or(
                "CANLOG_STORAGE_ROOT",
                defaults.storage_root.display().to_string(),
            )),
            service,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

const MEBIBYTE: u64 = 1024 * 1024;

/// Chunk cap in bytes; absurd settings clamp to `u64::MAX`
fn mebibytes(count: u64) -> u64 {
    count.saturating_mul(MEBIBYTE)
}

/// Parse an environment variable, falling back to `default` when unset or unparsable
fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
