use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;

use crate::store::once_stream;
use crate::{BlobError, BlobResult, BlockId, BlockStore, ByteStream};

#[derive(Debug, Default, Clone)]
struct ObjectEntry {
    /// Committed block list and the bytes each block contributed
    committed: Vec<(BlockId, Bytes)>,
    content: Option<Bytes>,
    uncommitted: BTreeMap<BlockId, Bytes>,
}

type Containers = HashMap<String, HashMap<String, ObjectEntry>>;

/// In-memory block store for tests, development and embedding
#[derive(Clone, Default)]
pub struct MemoryBlockStore {
    containers: Arc<RwLock<Containers>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed block ids of an object, in commit order
    pub fn committed_blocks(&self, container: &str, object: &str) -> Vec<BlockId> {
        self.containers
            .read()
            .get(container)
            .and_then(|objects| objects.get(object))
            .map(|entry| entry.committed.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    fn missing_container(container: &str) -> BlobError {
        BlobError::not_found(format!("container {container}"))
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn create_container(&self, container: &str) -> BlobResult<()> {
        self.containers
            .write()
            .entry(container.to_string())
            .or_default();
        Ok(())
    }

    async fn stage_block(
        &self,
        container: &str,
        object: &str,
        block_id: &BlockId,
        data: Bytes,
    ) -> BlobResult<()> {
        let mut containers = self.containers.write();
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| Self::missing_container(container))?;
        objects
            .entry(object.to_string())
            .or_default()
            .uncommitted
            .insert(block_id.clone(), data);
        Ok(())
    }

    async fn list_uncommitted_blocks(&self, container: &str, object: &str) -> BlobResult<Vec<BlockId>> {
        let containers = self.containers.read();
        let objects = containers
            .get(container)
            .ok_or_else(|| Self::missing_container(container))?;
        Ok(objects
            .get(object)
            .map(|entry| entry.uncommitted.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn commit_block_list(
        &self,
        container: &str,
        object: &str,
        block_ids: &[BlockId],
    ) -> BlobResult<()> {
        let mut containers = self.containers.write();
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| Self::missing_container(container))?;
        let entry = objects
            .get_mut(object)
            .ok_or_else(|| BlobError::not_found(object))?;

        // Resolve every id before mutating so a bad list leaves the object untouched
        let mut committed = Vec::with_capacity(block_ids.len());
        for id in block_ids {
            let data = entry
                .uncommitted
                .get(id)
                .or_else(|| entry.committed.iter().find(|(c, _)| c == id).map(|(_, d)| d))
                .cloned()
                .ok_or_else(|| BlobError::invalid(format!("unknown block id {id} for {object}")))?;
            committed.push((id.clone(), data));
        }

        let mut content = BytesMut::new();
        for (_, data) in &committed {
            content.extend_from_slice(data);
        }

        entry.committed = committed;
        entry.content = Some(content.freeze());
        entry.uncommitted.clear();
        Ok(())
    }

    async fn copy_object(&self, container: &str, source: &str, destination: &str) -> BlobResult<()> {
        let mut containers = self.containers.write();
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| Self::missing_container(container))?;
        let source_entry = objects
            .get(source)
            .filter(|entry| entry.content.is_some())
            .cloned()
            .ok_or_else(|| BlobError::not_found(source))?;
        objects.insert(
            destination.to_string(),
            ObjectEntry {
                uncommitted: BTreeMap::new(),
                ..source_entry
            },
        );
        Ok(())
    }

    async fn delete_object(&self, container: &str, object: &str) -> BlobResult<()> {
        let mut containers = self.containers.write();
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| Self::missing_container(container))?;
        objects
            .remove(object)
            .map(|_| ())
            .ok_or_else(|| BlobError::not_found(object))
    }

    async fn read_object(&self, container: &str, object: &str) -> BlobResult<ByteStream> {
        let containers = self.containers.read();
        let content = containers
            .get(container)
            .ok_or_else(|| Self::missing_container(container))?
            .get(object)
            .and_then(|entry| entry.content.clone())
            .ok_or_else(|| BlobError::not_found(object))?;
        Ok(once_stream(content))
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> BlobResult<Vec<String>> {
        let containers = self.containers.read();
        let objects = containers
            .get(container)
            .ok_or_else(|| Self::missing_container(container))?;
        let mut names: Vec<String> = objects
            .iter()
            .filter(|(name, entry)| entry.content.is_some() && name.starts_with(prefix))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(index: &str) -> BlockId {
        BlockId::from_chunk_index(index, 32).unwrap()
    }

    async fn store_with_container() -> MemoryBlockStore {
        let store = MemoryBlockStore::new();
        store.create_container("logs").await.unwrap();
        store
    }

    #[tokio::test]
    async fn commit_concatenates_in_list_order() {
        let store = store_with_container().await;
        store.stage_block("logs", "a.log", &block("1"), Bytes::from_static(b"BB")).await.unwrap();
        store.stage_block("logs", "a.log", &block("0"), Bytes::from_static(b"AA")).await.unwrap();

        let ids = store.list_uncommitted_blocks("logs", "a.log").await.unwrap();
        assert_eq!(ids, vec![block("0"), block("1")]);

        store.commit_block_list("logs", "a.log", &ids).await.unwrap();
        let content = store.read_object_bytes("logs", "a.log").await.unwrap();
        assert_eq!(&content[..], b"AABB");
        assert!(store.list_uncommitted_blocks("logs", "a.log").await.unwrap().is_empty());
        assert_eq!(store.committed_blocks("logs", "a.log"), ids);
    }

    #[tokio::test]
    async fn restaging_replaces_block_bytes() {
        let store = store_with_container().await;
        store.stage_block("logs", "a.log", &block("0"), Bytes::from_static(b"old")).await.unwrap();
        store.stage_block("logs", "a.log", &block("0"), Bytes::from_static(b"new")).await.unwrap();
        let ids = store.list_uncommitted_blocks("logs", "a.log").await.unwrap();
        assert_eq!(ids.len(), 1);
        store.commit_block_list("logs", "a.log", &ids).await.unwrap();
        assert_eq!(&store.read_object_bytes("logs", "a.log").await.unwrap()[..], b"new");
    }

    #[tokio::test]
    async fn uncommitted_objects_are_not_readable_or_listed() {
        let store = store_with_container().await;
        store.stage_block("logs", "a.log", &block("0"), Bytes::from_static(b"x")).await.unwrap();
        assert!(store.read_object("logs", "a.log").await.err().expect("expected error").is_not_found());
        assert!(store.list_objects("logs", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_block_id_leaves_object_untouched() {
        let store = store_with_container().await;
        store.stage_block("logs", "a.log", &block("0"), Bytes::from_static(b"x")).await.unwrap();
        let err = store
            .commit_block_list("logs", "a.log", &[block("0"), block("9")])
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Invalid { .. }));
        assert_eq!(store.list_uncommitted_blocks("logs", "a.log").await.unwrap(), vec![block("0")]);
    }

    #[tokio::test]
    async fn copy_list_and_delete() {
        let store = store_with_container().await;
        store.stage_block("logs", "a/tmp.log", &block("0"), Bytes::from_static(b"x")).await.unwrap();
        store.commit_block_list("logs", "a/tmp.log", &[block("0")]).await.unwrap();

        store.copy_object("logs", "a/tmp.log", "a/1/can.log").await.unwrap();
        store.delete_object("logs", "a/tmp.log").await.unwrap();

        assert_eq!(store.list_objects("logs", "a/").await.unwrap(), vec!["a/1/can.log".to_string()]);
        assert_eq!(&store.read_object_bytes("logs", "a/1/can.log").await.unwrap()[..], b"x");
        assert!(store.delete_object("logs", "a/tmp.log").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn missing_container_is_not_found() {
        let store = MemoryBlockStore::new();
        let err = store
            .stage_block("nope", "a.log", &block("0"), Bytes::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
