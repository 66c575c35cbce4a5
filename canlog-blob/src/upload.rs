use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BlobResult, ChunkReceipt, CommitReceipt, SessionId, UploadSession};

/// Shared handle to one session's state. Holding its lock serializes every
/// operation on that session.
pub type SessionHandle = Arc<tokio::sync::Mutex<UploadSession>>;

/// Coordinates resumable chunked uploads and their commit
#[async_trait]
pub trait UploadCoordinator: Send + Sync {
    /// Accept one chunk, opening a new session when `session_id` is absent or unknown
    async fn accept_chunk(
        &self,
        session_id: Option<&SessionId>,
        chunk_index: &str,
        payload: Bytes,
    ) -> BlobResult<ChunkReceipt>;

    /// Promote every staged block of the session into its object
    async fn commit(&self, session_id: &SessionId) -> BlobResult<CommitReceipt>;

    /// Abort an open session and clean up what it staged
    async fn abort(&self, session_id: &SessionId) -> BlobResult<()>;

    /// Get a snapshot of the session state
    async fn get_session(&self, session_id: &SessionId) -> BlobResult<UploadSession>;
}

/// Keyed table of upload sessions
#[async_trait]
pub trait UploadSessionStore: Send + Sync {
    /// Insert a new session
    async fn create(&self, session: UploadSession) -> BlobResult<SessionHandle>;

    /// Get the handle of an existing session
    async fn get(&self, session_id: &SessionId) -> BlobResult<SessionHandle>;

    /// Drop a session from the table
    async fn remove(&self, session_id: &SessionId) -> BlobResult<()>;

    /// Ids of every known session
    async fn list(&self) -> BlobResult<Vec<SessionId>>;
}
