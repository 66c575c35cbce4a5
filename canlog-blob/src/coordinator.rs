use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::{
    BlobConfig, BlobError, BlobResult, BlockId, BlockStore, ChunkReceipt, CommitReceipt,
    LocalStagingBuffer, ObjectKeyStrategy, SessionHandle, SessionId, UploadCoordinator,
    UploadSession, UploadSessionStore,
};

/// Default upload coordinator: mirrors chunks into a local buffer, stages them as
/// blocks, and promotes the staged block list on commit
pub struct DefaultUploadCoordinator {
    store: Arc<dyn BlockStore>,
    sessions: Arc<dyn UploadSessionStore>,
    keys: Arc<dyn ObjectKeyStrategy>,
    config: BlobConfig,
}

impl DefaultUploadCoordinator {
    pub fn new<S, SS, K>(store: S, sessions: SS, keys: K, config: BlobConfig) -> Self
    where
        S: BlockStore + 'static,
        SS: UploadSessionStore + 'static,
        K: ObjectKeyStrategy + 'static,
    {
        Self::from_shared(Arc::new(store), Arc::new(sessions), Arc::new(keys), config)
    }

    /// Build from handles that are shared with other components
    pub fn from_shared(
        store: Arc<dyn BlockStore>,
        sessions: Arc<dyn UploadSessionStore>,
        keys: Arc<dyn ObjectKeyStrategy>,
        config: BlobConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            keys,
            config,
        }
    }

    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    /// Resolve the session a chunk belongs to, opening a new one when needed
    async fn resolve_session(&self, session_id: Option<&SessionId>) -> BlobResult<SessionHandle> {
        if let Some(id) = session_id {
            match self.sessions.get(id).await {
                Ok(handle) => return Ok(handle),
                Err(e) if e.is_not_found() => {
                    debug!(requested = %id, "unknown session id, opening a new session");
                }
                Err(e) => return Err(e),
            }
        }
        self.open_session().await
    }

    async fn open_session(&self) -> BlobResult<SessionHandle> {
        let session_id = SessionId::new();
        let folder = self.config.default_folder.clone();
        let container = self.config.container.clone();
        let object_name = self.keys.staging_object(&folder, &session_id);

        self.store.create_container(&container).await?;
        let buffer = LocalStagingBuffer::create(&self.config.staging_dir, &session_id).await?;

        info!(
            session_id = %session_id,
            object = %object_name,
            buffer = %buffer.path().display(),
            "opened upload session"
        );

        let session = UploadSession::new(
            session_id,
            container,
            folder,
            object_name,
            buffer.path().to_path_buf(),
        );
        self.sessions.create(session).await
    }

    async fn stage(
        &self,
        session: &mut UploadSession,
        chunk_index: &str,
        block_id: &BlockId,
        payload: Bytes,
    ) -> BlobResult<()> {
        // A chunk whose bytes already reached the buffer (a retry after a failed
        // remote stage, or a re-sent index) is not appended a second time.
        if !session.is_buffered(chunk_index) {
            let buffer = LocalStagingBuffer::open(session.buffer_path.clone());
            buffer.append(&payload).await?;
            session.record_buffered(chunk_index, payload.len() as u64);
        } else {
            debug!(session_id = %session.session_id, chunk_index, "chunk already buffered locally");
        }

        self.store
            .stage_block(&session.container, &session.object_name, block_id, payload)
            .await?;
        session.record_staged(chunk_index);
        Ok(())
    }
}

#[async_trait]
impl UploadCoordinator for DefaultUploadCoordinator {
    async fn accept_chunk(
        &self,
        session_id: Option<&SessionId>,
        chunk_index: &str,
        payload: Bytes,
    ) -> BlobResult<ChunkReceipt> {
        // Validate before any side effect so a bad request never opens a session
        let block_id = BlockId::from_chunk_index(chunk_index, self.config.block_id_width)?;
        if payload.len() as u64 > self.config.max_chunk_bytes {
            return Err(BlobError::invalid(format!(
                "Chunk size {} exceeds maximum {}",
                payload.len(),
                self.config.max_chunk_bytes
            )));
        }

        let handle = self.resolve_session(session_id).await?;
        let mut session = handle.lock().await;
        session.ensure_open()?;

        let size = payload.len();
        if let Err(e) = self.stage(&mut session, chunk_index, &block_id, payload).await {
            warn!(
                session_id = %session.session_id,
                chunk_index,
                error = %e,
                "staging chunk failed"
            );
            return Err(BlobError::staging(session.session_id.as_str(), chunk_index, e));
        }

        debug!(
            session_id = %session.session_id,
            chunk_index,
            block_id = %block_id,
            size,
            "staged chunk"
        );

        Ok(ChunkReceipt {
            session_id: session.session_id.clone(),
            buffer_path: session.buffer_path.clone(),
            folder: session.folder.clone(),
            chunk_index: chunk_index.to_string(),
            block_id,
            received_bytes: session.received_bytes,
        })
    }

    async fn commit(&self, session_id: &SessionId) -> BlobResult<CommitReceipt> {
        let handle = self.sessions.get(session_id).await?;
        // Held across list + promote so a concurrent commit observes the final state
        let mut session = handle.lock().await;
        session.ensure_open()?;

        let block_ids = self
            .store
            .list_uncommitted_blocks(&session.container, &session.object_name)
            .await
            .map_err(|e| BlobError::commit(session_id.as_str(), e))?;

        if block_ids.is_empty() {
            return Err(BlobError::session_state(
                session_id.as_str(),
                session.state,
                "no staged blocks to commit",
            ));
        }

        if let Err(e) = self
            .store
            .commit_block_list(&session.container, &session.object_name, &block_ids)
            .await
        {
            warn!(session_id = %session_id, error = %e, "commit failed, session stays open");
            return Err(BlobError::commit(session_id.as_str(), e));
        }

        session.mark_committed()?;
        info!(
            session_id = %session_id,
            object = %session.object_name,
            blocks = block_ids.len(),
            "committed upload session"
        );

        Ok(CommitReceipt {
            session_id: session.session_id.clone(),
            container: session.container.clone(),
            object_name: session.object_name.clone(),
            block_ids,
            status: session.state,
        })
    }

    async fn abort(&self, session_id: &SessionId) -> BlobResult<()> {
        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;
        session.mark_aborted()?;

        match self
            .store
            .delete_object(&session.container, &session.object_name)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(session_id = %session_id, error = %e, "failed to drop staged blocks"),
        }
        if let Err(e) = LocalStagingBuffer::open(session.buffer_path.clone()).remove().await {
            warn!(session_id = %session_id, error = %e, "failed to remove local buffer");
        }

        info!(session_id = %session_id, "aborted upload session");
        Ok(())
    }

    async fn get_session(&self, session_id: &SessionId) -> BlobResult<UploadSession> {
        let handle = self.sessions.get(session_id).await?;
        let session = handle.lock().await;
        Ok(session.clone())
    }
}
