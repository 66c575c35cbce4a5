use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use proptest::prelude::*;

use canlog_blob::{
    BlobConfig, BlobError, BlobResult, BlockId, BlockStore, ByteStream, DefaultKeyStrategy,
    DefaultUploadCoordinator, FilesystemBlockStore, LocalStagingBuffer, MemoryBlockStore,
    MemorySessionStore, SessionId, SessionState, UploadCoordinator,
};

/// Test factory functions
fn create_test_config(dir: &tempfile::TempDir) -> BlobConfig {
    BlobConfig::new()
        .with_container("logs")
        .with_default_folder("can")
        .with_staging_dir(dir.path().join("staging"))
}

fn create_coordinator(store: MemoryBlockStore, dir: &tempfile::TempDir) -> DefaultUploadCoordinator {
    DefaultUploadCoordinator::new(
        store,
        MemorySessionStore::new(),
        DefaultKeyStrategy,
        create_test_config(dir),
    )
}

/// Block store that can be told to fail stage or commit calls
#[derive(Clone, Default)]
struct FlakyStore {
    inner: MemoryBlockStore,
    fail_stage: Arc<AtomicBool>,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl BlockStore for FlakyStore {
    async fn create_container(&self, container: &str) -> BlobResult<()> {
        self.inner.create_container(container).await
    }

    async fn stage_block(&self, container: &str, object: &str, block_id: &BlockId, data: Bytes) -> BlobResult<()> {
        if self.fail_stage.load(Ordering::SeqCst) {
            return Err(BlobError::invalid("stage unavailable"));
        }
        self.inner.stage_block(container, object, block_id, data).await
    }

    async fn list_uncommitted_blocks(&self, container: &str, object: &str) -> BlobResult<Vec<BlockId>> {
        self.inner.list_uncommitted_blocks(container, object).await
    }

    async fn commit_block_list(&self, container: &str, object: &str, block_ids: &[BlockId]) -> BlobResult<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(BlobError::invalid("commit unavailable"));
        }
        self.inner.commit_block_list(container, object, block_ids).await
    }

    async fn copy_object(&self, container: &str, source: &str, destination: &str) -> BlobResult<()> {
        self.inner.copy_object(container, source, destination).await
    }

    async fn delete_object(&self, container: &str, object: &str) -> BlobResult<()> {
        self.inner.delete_object(container, object).await
    }

    async fn read_object(&self, container: &str, object: &str) -> BlobResult<ByteStream> {
        self.inner.read_object(container, object).await
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> BlobResult<Vec<String>> {
        self.inner.list_objects(container, prefix).await
    }
}

#[tokio::test]
async fn test_first_chunk_opens_session_and_later_chunks_reuse_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryBlockStore::new();
    let coordinator = create_coordinator(store.clone(), &dir);

    let first = coordinator.accept_chunk(None, "0", Bytes::from_static(b"AAAA")).await.unwrap();
    assert_eq!(first.folder, "can");
    assert_eq!(first.received_bytes, 4);
    assert_eq!(first.block_id.as_str(), format!("{:0>32}", 0));

    let second = coordinator
        .accept_chunk(Some(&first.session_id), "1", Bytes::from_static(b"BBBB"))
        .await
        .unwrap();
    assert_eq!(second.session_id, first.session_id);
    assert_eq!(second.buffer_path, first.buffer_path);
    assert_eq!(second.received_bytes, 8);

    let buffer = LocalStagingBuffer::open(first.buffer_path.clone());
    assert_eq!(&buffer.read_all().await.unwrap()[..], b"AAAABBBB");

    let object = format!("can/{}.log", first.session_id);
    let staged = store.list_uncommitted_blocks("logs", &object).await.unwrap();
    assert_eq!(staged.len(), 2);
}

#[tokio::test]
async fn test_unknown_session_id_opens_fresh_session() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = create_coordinator(MemoryBlockStore::new(), &dir);

    let stale = SessionId::from_string("not-a-session".into());
    let receipt = coordinator
        .accept_chunk(Some(&stale), "0", Bytes::from_static(b"x"))
        .await
        .unwrap();
    assert_ne!(receipt.session_id, stale);
}

#[tokio::test]
async fn test_invalid_chunk_index_has_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = MemorySessionStore::new();
    let coordinator = DefaultUploadCoordinator::new(
        MemoryBlockStore::new(),
        sessions.clone(),
        DefaultKeyStrategy,
        create_test_config(&dir),
    );

    let err = coordinator
        .accept_chunk(None, "abc", Bytes::from_static(b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, BlobError::InvalidChunkIndex { .. }));
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_commit_orders_blocks_numerically() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryBlockStore::new();
    let coordinator = create_coordinator(store.clone(), &dir);

    let first = coordinator.accept_chunk(None, "10", Bytes::from_static(b"K")).await.unwrap();
    let id = first.session_id.clone();
    for (index, data) in [("2", "C"), ("0", "A"), ("1", "B")] {
        coordinator
            .accept_chunk(Some(&id), index, Bytes::from(data))
            .await
            .unwrap();
    }

    let receipt = coordinator.commit(&id).await.unwrap();
    assert_eq!(receipt.status, SessionState::Committed);
    assert_eq!(receipt.block_ids.len(), 4);

    let content = store.read_object_bytes("logs", &receipt.object_name).await.unwrap();
    assert_eq!(&content[..], b"ABCK");
}

#[tokio::test]
async fn test_resent_chunk_replaces_block_without_duplicating_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryBlockStore::new();
    let coordinator = create_coordinator(store.clone(), &dir);

    let first = coordinator.accept_chunk(None, "0", Bytes::from_static(b"AAAA")).await.unwrap();
    let id = first.session_id.clone();
    coordinator.accept_chunk(Some(&id), "0", Bytes::from_static(b"AAAA")).await.unwrap();
    coordinator.accept_chunk(Some(&id), "1", Bytes::from_static(b"BBBB")).await.unwrap();

    let session = coordinator.get_session(&id).await.unwrap();
    assert_eq!(session.chunks, vec!["0".to_string(), "1".to_string()]);
    assert_eq!(session.received_bytes, 8);

    let receipt = coordinator.commit(&id).await.unwrap();
    let content = store.read_object_bytes("logs", &receipt.object_name).await.unwrap();
    assert_eq!(&content[..], b"AAAABBBB");
}

#[tokio::test]
async fn test_failed_stage_reports_staging_error_and_retry_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let store = FlakyStore::default();
    let coordinator = DefaultUploadCoordinator::new(
        store.clone(),
        MemorySessionStore::new(),
        DefaultKeyStrategy,
        create_test_config(&dir),
    );

    let first = coordinator.accept_chunk(None, "0", Bytes::from_static(b"AA")).await.unwrap();
    let id = first.session_id.clone();

    store.fail_stage.store(true, Ordering::SeqCst);
    let err = coordinator
        .accept_chunk(Some(&id), "1", Bytes::from_static(b"BB"))
        .await
        .unwrap_err();
    assert!(matches!(err, BlobError::Staging { .. }));

    store.fail_stage.store(false, Ordering::SeqCst);
    let retried = coordinator
        .accept_chunk(Some(&id), "1", Bytes::from_static(b"BB"))
        .await
        .unwrap();
    assert_eq!(retried.received_bytes, 4);

    let buffer = LocalStagingBuffer::open(first.buffer_path);
    assert_eq!(&buffer.read_all().await.unwrap()[..], b"AABB");
}

#[tokio::test]
async fn test_commit_without_staged_blocks_is_a_state_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryBlockStore::new();
    let coordinator = create_coordinator(store.clone(), &dir);

    let first = coordinator.accept_chunk(None, "0", Bytes::from_static(b"A")).await.unwrap();
    coordinator.commit(&first.session_id).await.unwrap();

    // Second commit: session is already committed
    let err = coordinator.commit(&first.session_id).await.unwrap_err();
    assert!(matches!(
        err,
        BlobError::SessionState { state: SessionState::Committed, .. }
    ));

    let object = format!("can/{}.log", first.session_id);
    let content = store.read_object_bytes("logs", &object).await.unwrap();
    assert_eq!(&content[..], b"A");
}

#[tokio::test]
async fn test_commit_unknown_session_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = create_coordinator(MemoryBlockStore::new(), &dir);
    let err = coordinator.commit(&SessionId::new()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_failed_commit_leaves_session_open() {
    let dir = tempfile::tempdir().unwrap();
    let store = FlakyStore::default();
    let coordinator = DefaultUploadCoordinator::new(
        store.clone(),
        MemorySessionStore::new(),
        DefaultKeyStrategy,
        create_test_config(&dir),
    );

    let first = coordinator.accept_chunk(None, "0", Bytes::from_static(b"A")).await.unwrap();
    store.fail_commit.store(true, Ordering::SeqCst);
    let err = coordinator.commit(&first.session_id).await.unwrap_err();
    assert!(matches!(err, BlobError::Commit { .. }));
    assert_eq!(
        coordinator.get_session(&first.session_id).await.unwrap().state,
        SessionState::Open
    );

    store.fail_commit.store(false, Ordering::SeqCst);
    let receipt = coordinator.commit(&first.session_id).await.unwrap();
    assert_eq!(receipt.status, SessionState::Committed);
}

#[tokio::test]
async fn test_chunks_after_commit_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = create_coordinator(MemoryBlockStore::new(), &dir);

    let first = coordinator.accept_chunk(None, "0", Bytes::from_static(b"A")).await.unwrap();
    coordinator.commit(&first.session_id).await.unwrap();

    let err = coordinator
        .accept_chunk(Some(&first.session_id), "1", Bytes::from_static(b"B"))
        .await
        .unwrap_err();
    assert!(matches!(err, BlobError::SessionState { .. }));
}

#[tokio::test]
async fn test_concurrent_commits_promote_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryBlockStore::new();
    let coordinator = Arc::new(create_coordinator(store.clone(), &dir));

    let first = coordinator.accept_chunk(None, "0", Bytes::from_static(b"AB")).await.unwrap();
    let id = first.session_id.clone();

    let a = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        let id = id.clone();
        async move { coordinator.commit(&id).await }
    });
    let b = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        let id = id.clone();
        async move { coordinator.commit(&id).await }
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(BlobError::SessionState { .. }))));

    let object = format!("can/{}.log", id);
    assert_eq!(store.committed_blocks("logs", &object).len(), 1);
}

#[tokio::test]
async fn test_abort_discards_blocks_and_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryBlockStore::new();
    let coordinator = create_coordinator(store.clone(), &dir);

    let first = coordinator.accept_chunk(None, "0", Bytes::from_static(b"A")).await.unwrap();
    coordinator.abort(&first.session_id).await.unwrap();

    assert!(!first.buffer_path.exists());
    let object = format!("can/{}.log", first.session_id);
    assert!(store.list_uncommitted_blocks("logs", &object).await.unwrap().is_empty());

    let err = coordinator.commit(&first.session_id).await.unwrap_err();
    assert!(matches!(err, BlobError::SessionState { state: SessionState::Aborted, .. }));
}

#[tokio::test]
async fn test_filesystem_backed_session_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = FilesystemBlockStore::new(dir.path().join("blobs")).await.unwrap();
    let coordinator = DefaultUploadCoordinator::new(
        store.clone(),
        MemorySessionStore::new(),
        DefaultKeyStrategy,
        create_test_config(&dir),
    );

    let first = coordinator.accept_chunk(None, "1", Bytes::from_static(b"BBBB")).await.unwrap();
    coordinator
        .accept_chunk(Some(&first.session_id), "0", Bytes::from_static(b"AAAA"))
        .await
        .unwrap();
    let receipt = coordinator.commit(&first.session_id).await.unwrap();

    let content = store.read_object_bytes("logs", &receipt.object_name).await.unwrap();
    assert_eq!(&content[..], b"AAAABBBB");
    assert_eq!(
        store.list_objects("logs", "can/").await.unwrap(),
        vec![receipt.object_name.clone()]
    );
}

/// Chunks together with a random arrival order of their indices
fn chunks_and_arrival_order() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<usize>)> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 1..12).prop_flat_map(|chunks| {
        let indices: Vec<usize> = (0..chunks.len()).collect();
        (Just(chunks), Just(indices).prop_shuffle())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Committed content is the chunks concatenated by numeric index, whatever the arrival order
    #[test]
    fn committed_content_is_chunks_in_index_order((chunks, order) in chunks_and_arrival_order()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let content = runtime.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = MemoryBlockStore::new();
            let coordinator = create_coordinator(store.clone(), &dir);

            let mut session: Option<SessionId> = None;
            for index in &order {
                let receipt = coordinator
                    .accept_chunk(session.as_ref(), &index.to_string(), Bytes::from(chunks[*index].clone()))
                    .await
                    .unwrap();
                session = Some(receipt.session_id);
            }
            let id = session.unwrap();
            let receipt = coordinator.commit(&id).await.unwrap();
            store.read_object_bytes("logs", &receipt.object_name).await.unwrap()
        });

        let expected: Vec<u8> = chunks.concat();
        prop_assert_eq!(content.to_vec(), expected);
    }
}
