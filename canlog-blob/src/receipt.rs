use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{BlockId, SessionId, SessionState};

/// Returned after a chunk is mirrored locally and staged remotely.
///
/// Carries what a client needs to resume the same session on its next call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReceipt {
    pub session_id: SessionId,
    pub buffer_path: PathBuf,
    pub folder: String,
    pub chunk_index: String,
    pub block_id: BlockId,
    pub received_bytes: u64,
}

/// Returned after a session's staged blocks were promoted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub session_id: SessionId,
    pub container: String,
    pub object_name: String,
    pub block_ids: Vec<BlockId>,
    pub status: SessionState,
}
