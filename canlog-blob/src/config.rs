use std::path::PathBuf;

use crate::DEFAULT_BLOCK_ID_WIDTH;

/// Configuration for chunked uploads
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Container every session stages its blocks into
    pub container: String,

    /// Folder prefix for staged and final object names
    pub default_folder: String,

    /// Directory holding the local staging buffers
    pub staging_dir: PathBuf,

    /// Width chunk indices are zero-padded to when deriving block ids
    pub block_id_width: usize,

    /// Upper bound for a single chunk payload (safety guard)
    pub max_chunk_bytes: u64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            container: "canlogs".to_string(),
            default_folder: "uploads".to_string(),
            staging_dir: std::env::temp_dir().join("canlog-staging"),
            block_id_width: DEFAULT_BLOCK_ID_WIDTH,
            max_chunk_bytes: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container<S: Into<String>>(mut self, container: S) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_default_folder<S: Into<String>>(mut self, folder: S) -> Self {
        self.default_folder = folder.into();
        self
    }

    pub fn with_staging_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_block_id_width(mut self, width: usize) -> Self {
        self.block_id_width = width;
        self
    }

    /// Set max chunk size
    pub fn with_max_chunk_bytes(mut self, bytes: u64) -> Self {
        self.max_chunk_bytes = bytes;
        self
    }
}
