use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;

use crate::{BlobResult, BlockId, ByteStream, SessionId};

/// Block-oriented object store operations - must be implemented by all storage backends
///
/// An object is assembled from blocks: bytes are staged under a block id into an
/// uncommitted pool scoped to the object name, and a commit promotes a list of block
/// ids into the object's content in list order.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Create a container if it does not exist yet
    async fn create_container(&self, container: &str) -> BlobResult<()>;

    /// Stage bytes as an uncommitted block. Re-staging the same id replaces its bytes.
    async fn stage_block(
        &self,
        container: &str,
        object: &str,
        block_id: &BlockId,
        data: Bytes,
    ) -> BlobResult<()>;

    /// List the uncommitted block ids of an object in ascending order
    async fn list_uncommitted_blocks(&self, container: &str, object: &str) -> BlobResult<Vec<BlockId>>;

    /// Promote the listed blocks into the object's committed content, in list order
    async fn commit_block_list(
        &self,
        container: &str,
        object: &str,
        block_ids: &[BlockId],
    ) -> BlobResult<()>;

    /// Copy a committed object to a new name inside the same container
    async fn copy_object(&self, container: &str, source: &str, destination: &str) -> BlobResult<()>;

    /// Delete an object together with any uncommitted blocks staged for it
    async fn delete_object(&self, container: &str, object: &str) -> BlobResult<()>;

    /// Read the committed content of an object
    async fn read_object(&self, container: &str, object: &str) -> BlobResult<ByteStream>;

    /// List committed object names starting with `prefix`, sorted
    async fn list_objects(&self, container: &str, prefix: &str) -> BlobResult<Vec<String>>;

    /// Read and collect the committed content of an object
    async fn read_object_bytes(&self, container: &str, object: &str) -> BlobResult<Bytes> {
        let mut stream = self.read_object(container, object).await?;
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(data))
    }
}

/// Strategy for naming the objects an upload produces
pub trait ObjectKeyStrategy: Send + Sync {
    /// Name of the object a session stages its blocks against
    fn staging_object(&self, folder: &str, session_id: &SessionId) -> String;

    /// Final name of a processed recording
    fn final_object(&self, folder: &str, timestamp: &str, file_name: &str) -> String;

    /// Name of the summary document written next to a processed recording
    fn summary_object(&self, folder: &str, timestamp: &str, summary_name: &str) -> String;
}

/// Default key strategy: `folder/session.log` while uploading, `folder/timestamp/name` afterwards
#[derive(Debug, Clone, Default)]
pub struct DefaultKeyStrategy;

impl ObjectKeyStrategy for DefaultKeyStrategy {
    fn staging_object(&self, folder: &str, session_id: &SessionId) -> String {
        format!("{}/{}.log", folder, session_id)
    }

    fn final_object(&self, folder: &str, timestamp: &str, file_name: &str) -> String {
        format!("{}/{}/{}", folder, timestamp, file_name)
    }

    fn summary_object(&self, folder: &str, timestamp: &str, summary_name: &str) -> String {
        format!("{}/{}/{}", folder, timestamp, summary_name)
    }
}

/// Wrap an owned buffer as a single-item byte stream
pub(crate) fn once_stream(data: Bytes) -> ByteStream {
    Box::pin(futures_util::stream::once(async move { Ok(data) }))
}
