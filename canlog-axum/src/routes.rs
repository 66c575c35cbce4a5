use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use canlog_blob::{ChunkReceipt, CommitReceipt, SessionId};
use canlog_service::{CanlogService, Summary, SummaryEntry};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::CanlogAxumError;

type RouteResult<T> = Result<T, CanlogAxumError>;

#[derive(Debug, Deserialize)]
pub struct GuidQuery {
    pub guid: Option<String>,
}

impl GuidQuery {
    fn session_id(self) -> RouteResult<SessionId> {
        match self.guid {
            Some(guid) if !guid.is_empty() => Ok(SessionId::from_string(guid)),
            _ => Err(CanlogAxumError::bad_request("query parameter guid is required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    pub folder: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimestampQuery {
    pub timestamp: Option<String>,
}

pub async fn health() -> &'static str {
    "ok"
}

/// Multipart fields: `file` (chunk bytes), `chunk` (index), optional `guid`
pub async fn upload(
    State(service): State<Arc<CanlogService>>,
    mut multipart: Multipart,
) -> RouteResult<Json<ChunkReceipt>> {
    let mut payload: Option<Bytes> = None;
    let mut chunk: Option<String> = None;
    let mut guid: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CanlogAxumError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let read_error = |e: axum::extract::multipart::MultipartError| {
            CanlogAxumError::bad_request(format!("could not read field {name}: {e}"))
        };
        match name.as_str() {
            "chunk" => chunk = Some(field.text().await.map_err(read_error)?),
            "guid" => guid = Some(field.text().await.map_err(read_error)?),
            _ if name == "file" || field.file_name().is_some() => {
                payload = Some(field.bytes().await.map_err(read_error)?)
            }
            _ => {}
        }
    }

    let payload = payload.ok_or_else(|| CanlogAxumError::bad_request("multipart field file is required"))?;
    let chunk = chunk.ok_or_else(|| CanlogAxumError::bad_request("multipart field chunk is required"))?;
    let session_id = guid
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .map(SessionId::from_string);

    let receipt = service
        .begin_or_continue_upload(session_id.as_ref(), chunk.trim(), payload)
        .await?;
    Ok(Json(receipt))
}

pub async fn commit(
    State(service): State<Arc<CanlogService>>,
    Query(query): Query<GuidQuery>,
) -> RouteResult<Json<CommitReceipt>> {
    let session_id = query.session_id()?;
    Ok(Json(service.commit_session(&session_id).await?))
}

pub async fn abort(
    State(service): State<Arc<CanlogService>>,
    Query(query): Query<GuidQuery>,
) -> RouteResult<Json<Value>> {
    let session_id = query.session_id()?;
    service.abort_session(&session_id).await?;
    Ok(Json(json!({ "session_id": session_id, "status": "aborted" })))
}

pub async fn process(
    State(service): State<Arc<CanlogService>>,
    Query(query): Query<GuidQuery>,
) -> RouteResult<Json<Summary>> {
    let session_id = query.session_id()?;
    Ok(Json(service.process_session(&session_id).await?))
}

pub async fn list(
    State(service): State<Arc<CanlogService>>,
    Query(query): Query<FolderQuery>,
) -> RouteResult<Json<Vec<SummaryEntry>>> {
    Ok(Json(service.list_summaries(query.folder.as_deref()).await?))
}

pub async fn retrieve(
    State(service): State<Arc<CanlogService>>,
    Query(query): Query<TimestampQuery>,
) -> RouteResult<impl IntoResponse> {
    let timestamp = query.timestamp.unwrap_or_default();
    let body = service.retrieve_summary(&timestamp).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}
