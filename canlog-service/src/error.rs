//! # Service errors
//!
//! Every failure a caller can see maps onto an [`ErrorKind`] with a status code, a
//! `name` and a kebab-cased `className`, so the transport can render one structured
//! payload without inspecting the source error.

use canlog_blob::BlobError;
use canlog_header::FormatError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SessionState, // 409
    Staging,      // 502
    Format,       // 422
    Publish,      // 502
    NotFound,     // 404
    BadRequest,   // 400
    Storage,      // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::SessionState => 409,
            ErrorKind::Staging => 502,
            ErrorKind::Format => 422,
            ErrorKind::Publish => 502,
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequest => 400,
            ErrorKind::Storage => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::SessionState => "SessionStateError",
            ErrorKind::Staging => "StagingError",
            ErrorKind::Format => "FormatError",
            ErrorKind::Publish => "PublishError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Storage => "StorageError",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::SessionState => "session-state",
            ErrorKind::Staging => "staging",
            ErrorKind::Format => "format",
            ErrorKind::Publish => "publish",
            ErrorKind::NotFound => "not-found",
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::Storage => "storage",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("Header decode failed: {0}")]
    Format(#[from] FormatError),

    #[error("Publishing summary to {target} failed: {source}")]
    Publish {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ServiceError {
    pub fn publish(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Publish {
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Blob(blob) => match blob {
                BlobError::NotFound { .. } => ErrorKind::NotFound,
                BlobError::Invalid { .. } | BlobError::InvalidChunkIndex { .. } => ErrorKind::BadRequest,
                BlobError::SessionState { .. } => ErrorKind::SessionState,
                BlobError::Staging { .. } => ErrorKind::Staging,
                BlobError::Io { source } if source.kind() == std::io::ErrorKind::NotFound => {
                    ErrorKind::NotFound
                }
                BlobError::Commit { .. }
                | BlobError::Backend { .. }
                | BlobError::Io { .. }
                | BlobError::Serialization { .. } => ErrorKind::Storage,
            },
            ServiceError::Format(_) => ErrorKind::Format,
            ServiceError::Publish { .. } => ErrorKind::Publish,
            ServiceError::BadRequest(_) => ErrorKind::BadRequest,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Structured payload for clients: `{ name, message, code, className, kind }`
    pub fn to_json(&self) -> serde_json::Value {
        let kind = self.kind();
        serde_json::json!({
            "name": kind.name(),
            "message": self.to_string(),
            "code": kind.status_code(),
            "className": kind.class_name(),
            "kind": kind.class_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canlog_blob::SessionState;

    #[test]
    fn kinds_follow_the_source_error() {
        let state: ServiceError =
            BlobError::session_state("s1", SessionState::Committed, "already committed").into();
        assert_eq!(state.kind(), ErrorKind::SessionState);
        assert_eq!(state.status_code(), 409);

        let chunk: ServiceError = BlobError::invalid_chunk_index("x", "not digits").into();
        assert_eq!(chunk.kind(), ErrorKind::BadRequest);

        let format: ServiceError = FormatError::invalid_ascii("recording_date", 88).into();
        assert_eq!(format.kind(), ErrorKind::Format);

        let missing: ServiceError = BlobError::not_found("uploads/1/summary.json").into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn json_payload_carries_kind_and_message() {
        let err = ServiceError::publish("canlog-summaries", "queue unavailable");
        let json = err.to_json();
        assert_eq!(json["name"], "PublishError");
        assert_eq!(json["code"], 502);
        assert_eq!(json["className"], "publish");
        assert_eq!(json["kind"], "publish");
        assert!(json["message"].as_str().unwrap().contains("queue unavailable"));
    }
}
