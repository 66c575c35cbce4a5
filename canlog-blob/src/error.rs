use thiserror::Error;

use crate::SessionState;

/// Result type for block store and upload operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur while staging, committing or reading blocks
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Object not found: {name}")]
    NotFound { name: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Invalid chunk index {index:?}: {reason}")]
    InvalidChunkIndex { index: String, reason: String },

    #[error("Upload session {session_id} is {state}: {message}")]
    SessionState {
        session_id: String,
        state: SessionState,
        message: String,
    },

    #[error("Staging chunk {chunk_index} of session {session_id} failed: {source}")]
    Staging {
        session_id: String,
        chunk_index: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Committing session {session_id} failed: {source}")]
    Commit {
        session_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn invalid_chunk_index<I: Into<String>, R: Into<String>>(index: I, reason: R) -> Self {
        Self::InvalidChunkIndex {
            index: index.into(),
            reason: reason.into(),
        }
    }

    /// Create a session lifecycle error
    pub fn session_state<I, M>(session_id: I, state: SessionState, message: M) -> Self
    where
        I: Into<String>,
        M: Into<String>,
    {
        Self::SessionState {
            session_id: session_id.into(),
            state,
            message: message.into(),
        }
    }

    /// Wrap a failure that happened while appending or staging a chunk
    pub fn staging<I, C>(session_id: I, chunk_index: C, source: BlobError) -> Self
    where
        I: Into<String>,
        C: Into<String>,
    {
        Self::Staging {
            session_id: session_id.into(),
            chunk_index: chunk_index.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a failure that happened while promoting staged blocks
    pub fn commit<I: Into<String>>(session_id: I, source: BlobError) -> Self {
        Self::Commit {
            session_id: session_id.into(),
            source: Box::new(source),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io { source } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
