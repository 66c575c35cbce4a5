use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::pin::Pin;
use uuid::Uuid;

use crate::{BlobError, BlobResult};

/// Stream of bytes for object content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Width of the zero-padded block ids derived from chunk indices
pub const DEFAULT_BLOCK_ID_WIDTH: usize = 32;

/// Unique identifier for an upload session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from existing string (e.g. the `guid` a client echoes back)
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote block identifier: the chunk index left-padded with zeros to a fixed width.
///
/// Because every id has the same width and only holds digits, lexical order of
/// block ids is the numeric order of the chunk indices they came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Derive the block id for a client-supplied chunk index
    pub fn from_chunk_index(index: &str, width: usize) -> BlobResult<Self> {
        if index.is_empty() {
            return Err(BlobError::invalid_chunk_index(index, "chunk index is empty"));
        }
        if !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BlobError::invalid_chunk_index(
                index,
                "chunk index must contain only ASCII digits",
            ));
        }
        if index.len() > width {
            return Err(BlobError::invalid_chunk_index(
                index,
                format!("chunk index is wider than {width} digits"),
            ));
        }
        Ok(Self(format!("{index:0>width$}")))
    }

    /// Wrap an id read back from a store
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an upload session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Open,
    Committed,
    Aborted,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Open => "open",
            SessionState::Committed => "committed",
            SessionState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Open)
    }

    /// Transition for a successful commit. Only an open session may commit.
    pub fn commit(self) -> Result<SessionState, SessionState> {
        match self {
            SessionState::Open => Ok(SessionState::Committed),
            other => Err(other),
        }
    }

    /// Transition for an abort. Only an open session may abort.
    pub fn abort(self) -> Result<SessionState, SessionState> {
        match self {
            SessionState::Open => Ok(SessionState::Aborted),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload session state, owned by the assembler while open
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub session_id: SessionId,
    pub container: String,
    pub folder: String,
    pub object_name: String,
    pub buffer_path: PathBuf,

    /// Chunk indices staged remotely, in the order they were first received
    pub chunks: Vec<String>,
    /// Chunk indices already mirrored into the local buffer
    pub buffered: BTreeSet<String>,
    /// Bytes mirrored into the local buffer
    pub received_bytes: u64,
    pub state: SessionState,
    /// Set once a committed session's recording was processed. The entry stays
    /// behind so its id keeps rejecting chunks and commits.
    #[serde(default)]
    pub processed: bool,

    pub created_at: i64,
    pub updated_at: i64,
}

impl UploadSession {
    pub fn new(
        session_id: SessionId,
        container: String,
        folder: String,
        object_name: String,
        buffer_path: PathBuf,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            session_id,
            container,
            folder,
            object_name,
            buffer_path,
            chunks: Vec::new(),
            buffered: BTreeSet::new(),
            received_bytes: 0,
            state: SessionState::Open,
            processed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_buffered(&self, chunk_index: &str) -> bool {
        self.buffered.contains(chunk_index)
    }

    /// Record that a chunk's bytes were appended to the local buffer
    pub fn record_buffered(&mut self, chunk_index: &str, size_bytes: u64) {
        if self.buffered.insert(chunk_index.to_string()) {
            self.received_bytes += size_bytes;
        }
        self.touch();
    }

    /// Record a staged chunk. A re-sent index is only listed once.
    pub fn record_staged(&mut self, chunk_index: &str) {
        if !self.chunks.iter().any(|c| c == chunk_index) {
            self.chunks.push(chunk_index.to_string());
        }
        self.touch();
    }

    /// Fail with a session-state error unless the session is still open
    pub fn ensure_open(&self) -> BlobResult<()> {
        if self.state.is_terminal() {
            return Err(BlobError::session_state(
                self.session_id.as_str(),
                self.state,
                "session no longer accepts chunks or commits",
            ));
        }
        Ok(())
    }

    pub fn mark_committed(&mut self) -> BlobResult<()> {
        self.state = self.state.commit().map_err(|state| {
            BlobError::session_state(self.session_id.as_str(), state, "session cannot be committed")
        })?;
        self.touch();
        Ok(())
    }

    pub fn mark_aborted(&mut self) -> BlobResult<()> {
        self.state = self.state.abort().map_err(|state| {
            BlobError::session_state(self.session_id.as_str(), state, "session cannot be aborted")
        })?;
        self.touch();
        Ok(())
    }

    /// Mark a committed session as processed; a second call fails
    pub fn mark_processed(&mut self) -> BlobResult<()> {
        if self.state != SessionState::Committed {
            return Err(BlobError::session_state(
                self.session_id.as_str(),
                self.state,
                "only committed sessions can be processed",
            ));
        }
        if self.processed {
            return Err(BlobError::session_state(
                self.session_id.as_str(),
                self.state,
                "session was already processed",
            ));
        }
        self.processed = true;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp();
    }
}
