//! # canlog-blob: resumable chunked uploads over block storage
//!
//! `canlog-blob` accepts a recording as a sequence of numbered chunks, mirrors each one
//! into a local staging buffer, and stages it remotely as a block whose id is the chunk
//! index zero-padded to a fixed width. Committing a session lists the staged blocks,
//! orders them by id and promotes them into a single object.
//!
//! ## Quick Start
//!
//! ```rust
//! use canlog_blob::prelude::*;
//! use bytes::Bytes;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let config = BlobConfig::new().with_staging_dir(std::env::temp_dir().join("canlog-doc"));
//! let coordinator = DefaultUploadCoordinator::new(
//!     MemoryBlockStore::new(),
//!     MemorySessionStore::new(),
//!     DefaultKeyStrategy,
//!     config,
//! );
//!
//! let first = coordinator.accept_chunk(None, "0", Bytes::from_static(b"AAAA")).await?;
//! coordinator
//!     .accept_chunk(Some(&first.session_id), "1", Bytes::from_static(b"BBBB"))
//!     .await?;
//! let receipt = coordinator.commit(&first.session_id).await?;
//! assert_eq!(receipt.block_ids.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │  UploadCoordinator       │  ← session lifecycle, local buffer, block ids
//! ├──────────────────────────┤
//! │  BlockStore              │  ← stage / list / commit / copy / delete
//! └──────────────────────────┘
//! ```
//!
//! Backends: [`MemoryBlockStore`] for tests, [`FilesystemBlockStore`] for single-node
//! deployments and [`S3BlockStore`] for S3-compatible services.

mod config;
mod coordinator;
mod error;
mod fs_store;
mod memory_store;
mod receipt;
mod s3_store;
mod session_store;
mod staging;
pub mod store;
mod types;
mod upload;

pub use config::BlobConfig;
pub use coordinator::DefaultUploadCoordinator;
pub use error::{BlobError, BlobResult};
pub use fs_store::FilesystemBlockStore;
pub use memory_store::MemoryBlockStore;
pub use receipt::{ChunkReceipt, CommitReceipt};
pub use s3_store::{S3BlockStore, S3Config};
pub use session_store::MemorySessionStore;
pub use staging::LocalStagingBuffer;
pub use store::{BlockStore, DefaultKeyStrategy, ObjectKeyStrategy};
pub use types::{
    BlockId, ByteStream, SessionId, SessionState, UploadSession, DEFAULT_BLOCK_ID_WIDTH,
};
pub use upload::{SessionHandle, UploadCoordinator, UploadSessionStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobConfig, BlobError, BlobResult, BlockId, BlockStore, DefaultKeyStrategy,
        DefaultUploadCoordinator, MemoryBlockStore, MemorySessionStore, SessionId,
        SessionState, UploadCoordinator,
    };
}
