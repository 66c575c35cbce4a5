use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use canlog_blob::{BlockId, BlockStore, DEFAULT_BLOCK_ID_WIDTH};
use tracing::debug;

use crate::{ServiceError, ServiceResult, Summary};

/// Persistence for summary documents
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Write a summary as JSON under `name`, replacing any earlier document
    async fn put(&self, name: &str, summary: &Summary) -> ServiceResult<()>;

    /// Raw JSON of a stored summary
    async fn get(&self, name: &str) -> ServiceResult<Bytes>;
}

/// Stores summaries as single-block objects in the pipeline's container
#[derive(Clone)]
pub struct BlockSummaryStore {
    store: Arc<dyn BlockStore>,
    container: String,
}

impl BlockSummaryStore {
    pub fn new(store: Arc<dyn BlockStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }
}

#[async_trait]
impl SummaryStore for BlockSummaryStore {
    async fn put(&self, name: &str, summary: &Summary) -> ServiceResult<()> {
        let body = summary.to_json_bytes().map_err(|e| ServiceError::publish(name, e))?;
        let block = BlockId::from_chunk_index("0", DEFAULT_BLOCK_ID_WIDTH)?;

        self.store
            .stage_block(&self.container, name, &block, Bytes::from(body))
            .await
            .map_err(|e| ServiceError::publish(name, e))?;
        self.store
            .commit_block_list(&self.container, name, std::slice::from_ref(&block))
            .await
            .map_err(|e| ServiceError::publish(name, e))?;

        debug!(container = %self.container, object = name, "stored summary");
        Ok(())
    }

    async fn get(&self, name: &str) -> ServiceResult<Bytes> {
        Ok(self.store.read_object_bytes(&self.container, name).await?)
    }
}
