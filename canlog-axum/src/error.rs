use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use canlog_blob::BlobError;
use canlog_service::ServiceError;

/// Route error rendered as the structured service error payload
#[derive(Debug)]
pub struct CanlogAxumError(pub ServiceError);

impl From<ServiceError> for CanlogAxumError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl From<BlobError> for CanlogAxumError {
    fn from(e: BlobError) -> Self {
        Self(e.into())
    }
}

impl CanlogAxumError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(ServiceError::bad_request(message))
    }
}

impl IntoResponse for CanlogAxumError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, "request rejected");
        }
        (status, Json(self.0.to_json())).into_response()
    }
}
