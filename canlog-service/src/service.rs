use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use canlog_blob::{
    BlobError, BlockStore, ChunkReceipt, CommitReceipt, DefaultKeyStrategy,
    DefaultUploadCoordinator, LocalStagingBuffer, MemorySessionStore, ObjectKeyStrategy,
    SessionId, SessionState, UploadCoordinator, UploadSessionStore,
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    BlockSummaryStore, ErrorKind, NotificationPublisher, ProcessingStatus, ServiceConfig, ServiceError,
    ServiceResult, Summary, SummaryAssembler, SummaryEntry, SummaryStore,
};

/// The ingestion pipeline: chunked upload, commit, header decode, summary persistence
/// and notification.
///
/// Every operation takes the session it works on by id; per-session state lives in the
/// session store behind one lock per session.
pub struct CanlogService {
    store: Arc<dyn BlockStore>,
    sessions: Arc<dyn UploadSessionStore>,
    uploads: DefaultUploadCoordinator,
    summaries: Arc<dyn SummaryStore>,
    publisher: Arc<dyn NotificationPublisher>,
    assembler: SummaryAssembler,
    config: ServiceConfig,
}

impl CanlogService {
    pub fn new(
        store: Arc<dyn BlockStore>,
        publisher: Arc<dyn NotificationPublisher>,
        config: ServiceConfig,
    ) -> Self {
        let sessions: Arc<dyn UploadSessionStore> = Arc::new(MemorySessionStore::new());
        let keys: Arc<dyn ObjectKeyStrategy> = Arc::new(DefaultKeyStrategy);
        let summaries: Arc<dyn SummaryStore> =
            Arc::new(BlockSummaryStore::new(Arc::clone(&store), config.container()));
        Self::from_parts(store, sessions, keys, summaries, publisher, config)
    }

    pub fn from_parts(
        store: Arc<dyn BlockStore>,
        sessions: Arc<dyn UploadSessionStore>,
        keys: Arc<dyn ObjectKeyStrategy>,
        summaries: Arc<dyn SummaryStore>,
        publisher: Arc<dyn NotificationPublisher>,
        config: ServiceConfig,
    ) -> Self {
        let uploads = DefaultUploadCoordinator::from_shared(
            Arc::clone(&store),
            Arc::clone(&sessions),
            Arc::clone(&keys),
            config.blob.clone(),
        );
        let assembler = SummaryAssembler::new(config.clone(), keys);
        Self {
            store,
            sessions,
            uploads,
            summaries,
            publisher,
            assembler,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Provision the container and the notification queue
    pub async fn init(&self) -> ServiceResult<()> {
        self.store.create_container(self.config.container()).await?;
        self.publisher.ensure_queue(&self.config.queue_name).await?;
        info!(
            container = %self.config.container(),
            queue = %self.config.queue_name,
            "storage and queue ready"
        );
        Ok(())
    }

    /// Accept one chunk, opening a session when `session_id` is absent or unknown
    pub async fn begin_or_continue_upload(
        &self,
        session_id: Option<&SessionId>,
        chunk_index: &str,
        payload: Bytes,
    ) -> ServiceResult<ChunkReceipt> {
        Ok(self.uploads.accept_chunk(session_id, chunk_index, payload).await?)
    }

    pub async fn commit_session(&self, session_id: &SessionId) -> ServiceResult<CommitReceipt> {
        Ok(self.uploads.commit(session_id).await?)
    }

    pub async fn abort_session(&self, session_id: &SessionId) -> ServiceResult<()> {
        Ok(self.uploads.abort(session_id).await?)
    }

    /// Decode the header of an assembled file and build its summary.
    ///
    /// Only the header bytes are read; the decode runs on the blocking pool.
    pub async fn decode_and_summarize(&self, path: &Path) -> ServiceResult<Summary> {
        let path = path.to_path_buf();
        let record = tokio::task::spawn_blocking(move || canlog_header::decode_file(&path))
            .await
            .map_err(BlobError::backend)??;
        Ok(self.assembler.assemble(&record, self.config.default_folder()))
    }

    /// Decode a committed session, copy its recording under the timestamp folder,
    /// persist the summary and publish it.
    ///
    /// The temporary object and the local buffer are released only once the summary
    /// is both stored and published, so a failed run can be retried.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn process_session(&self, session_id: &SessionId) -> ServiceResult<Summary> {
        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;

        if session.state != SessionState::Committed {
            return Err(BlobError::session_state(
                session_id.as_str(),
                session.state,
                "only committed sessions can be processed",
            )
            .into());
        }
        if session.processed {
            return Err(BlobError::session_state(
                session_id.as_str(),
                session.state,
                "session was already processed",
            )
            .into());
        }
        let folder = session.folder.clone();
        let container = session.container.clone();
        let object = session.object_name.clone();

        // The buffer mirrors chunks in arrival order; the committed object is in
        // block order and holds the latest payload of a re-sent index.
        let buffer = LocalStagingBuffer::open(session.buffer_path.clone());
        let committed = self.store.read_object(&container, &object).await?;
        let size = buffer.replace_with(committed).await?;
        debug!(object = %object, bytes = size, "rebuilt local buffer from committed object");

        let mut summary = match self.decode_and_summarize(buffer.path()).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, buffer = %buffer.path().display(), "decode failed, keeping local buffer");
                return Err(e);
            }
        };

        debug!(from = %object, to = %summary.blob_name, "copying recording");
        if let Err(e) = self.store.copy_object(&container, &object, &summary.blob_name).await {
            error!(error = %e, "copying recording failed");
            summary.status = ProcessingStatus::Failed;
            self.report_failure(&mut summary, &folder).await;
            return Err(e.into());
        }

        self.store_and_publish(&mut summary, &folder).await?;

        if let Err(e) = self.store.delete_object(&container, &object).await {
            warn!(error = %e, object = %object, "could not delete temporary object");
        }
        session.mark_processed()?;
        if let Err(e) = buffer.remove().await {
            warn!(error = %e, buffer = %buffer.path().display(), "could not remove local buffer");
        }

        info!(
            timestamp = %summary.timestamp,
            blob = %summary.blob_name,
            "processed upload session"
        );
        Ok(summary)
    }

    /// Persist and publish a `failed` summary unless a summary is already stored
    /// under its name
    async fn report_failure(&self, summary: &mut Summary, folder: &str) {
        let name = self.assembler.summary_object(folder, &summary.timestamp);
        match self.summaries.get(&name).await {
            Ok(_) => {
                warn!(summary = %name, "summary already stored, not overwriting it");
                return;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(error = %e, summary = %name, "could not check for a stored summary");
                return;
            }
        }
        if let Err(report) = self.store_and_publish(summary, folder).await {
            warn!(error = %report, "could not report failed processing");
        }
    }

    async fn store_and_publish(&self, summary: &mut Summary, folder: &str) -> ServiceResult<()> {
        let name = self.assembler.summary_object(folder, &summary.timestamp);
        summary.summary_file_name = Some(name.clone());
        self.summaries.put(&name, summary).await?;

        let message = summary
            .to_json_bytes()
            .map_err(|e| ServiceError::publish(&self.config.queue_name, e))?;
        self.publisher.ensure_queue(&self.config.queue_name).await?;
        self.publisher
            .publish(&self.config.queue_name, Bytes::from(message))
            .await?;
        debug!(queue = %self.config.queue_name, summary = %name, "published summary");
        Ok(())
    }

    /// Summary documents in the container, optionally restricted to one folder
    pub async fn list_summaries(&self, folder: Option<&str>) -> ServiceResult<Vec<SummaryEntry>> {
        let container = self.config.container();
        self.store.create_container(container).await?;

        let mut entries: Vec<SummaryEntry> = self
            .store
            .list_objects(container, "")
            .await?
            .iter()
            .filter_map(|name| SummaryEntry::parse(name))
            .filter(|entry| entry.matches_folder(folder))
            .collect();
        entries.sort();
        Ok(entries)
    }

    /// Raw JSON of the summary stored for `timestamp` in the default folder
    pub async fn retrieve_summary(&self, timestamp: &str) -> ServiceResult<Bytes> {
        let valid = !timestamp.is_empty()
            && timestamp
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if !valid {
            return Err(ServiceError::bad_request(format!(
                "timestamp {timestamp:?} must be alphanumeric"
            )));
        }
        let name = self
            .assembler
            .summary_object(self.config.default_folder(), timestamp);
        self.summaries.get(&name).await
    }
}
