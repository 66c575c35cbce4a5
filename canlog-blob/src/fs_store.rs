//! Local filesystem block store.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{BlobError, BlobResult, BlockId, BlockStore, ByteStream};

/// Directory, inside each container, holding staged blocks per object
const BLOCKS_DIR: &str = ".blocks";

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Filesystem block store.
///
/// Committed content lives at `<root>/<container>/<object>`; staged blocks at
/// `<root>/<container>/.blocks/<object>/<block_id>`.
#[derive(Debug, Clone)]
pub struct FilesystemBlockStore {
    root: PathBuf,
}

impl FilesystemBlockStore {
    /// Create a new filesystem store rooted at `root`
    pub async fn new(root: impl AsRef<Path>) -> BlobResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reject keys that would escape their parent directory
    fn validate_key(key: &str) -> BlobResult<()> {
        if key.is_empty() {
            return Err(BlobError::invalid("empty key"));
        }
        if key.starts_with('/') || key.starts_with('\\') || key.contains("..") {
            return Err(BlobError::invalid(format!("path traversal not allowed: {key}")));
        }
        for component in Path::new(key).components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(BlobError::invalid(format!("unsafe path component in key: {key}")));
            }
        }
        Ok(())
    }

    fn container_path(&self, container: &str) -> BlobResult<PathBuf> {
        Self::validate_key(container)?;
        if container.contains('/') {
            return Err(BlobError::invalid(format!("container names cannot nest: {container}")));
        }
        Ok(self.root.join(container))
    }

    fn object_path(&self, container: &str, object: &str) -> BlobResult<PathBuf> {
        Self::validate_key(object)?;
        if object == BLOCKS_DIR || object.starts_with(&format!("{BLOCKS_DIR}/")) {
            return Err(BlobError::invalid(format!("reserved object name: {object}")));
        }
        Ok(self.container_path(container)?.join(object))
    }

    fn blocks_path(&self, container: &str, object: &str) -> BlobResult<PathBuf> {
        self.object_path(container, object)?;
        Ok(self.container_path(container)?.join(BLOCKS_DIR).join(object))
    }

    fn block_path(&self, container: &str, object: &str, block_id: &BlockId) -> BlobResult<PathBuf> {
        let id = block_id.as_str();
        Self::validate_key(id)?;
        if id.contains('/') || id.starts_with('.') {
            return Err(BlobError::invalid(format!("invalid block id: {id}")));
        }
        Ok(self.blocks_path(container, object)?.join(id))
    }

    async fn ensure_container(&self, container: &str) -> BlobResult<PathBuf> {
        let path = self.container_path(container)?;
        if !fs::try_exists(&path).await? {
            return Err(BlobError::not_found(format!("container {container}")));
        }
        Ok(path)
    }

    async fn write_atomic(path: &Path, scratch_dir: &Path, data: &[u8]) -> BlobResult<()> {
        fs::create_dir_all(scratch_dir).await?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let scratch = scratch_dir.join(format!(".tmp-{}", Uuid::new_v4().simple()));
        let mut file = fs::File::create(&scratch).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        if let Err(e) = fs::rename(&scratch, path).await {
            let _ = fs::remove_file(&scratch).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn map_missing(err: std::io::Error, name: &str) -> BlobError {
        if err.kind() == std::io::ErrorKind::NotFound {
            BlobError::not_found(name)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl BlockStore for FilesystemBlockStore {
    async fn create_container(&self, container: &str) -> BlobResult<()> {
        let path = self.container_path(container)?;
        fs::create_dir_all(&path).await?;
        Ok(())
    }

    #[instrument(skip(self, data), fields(len = data.len()))]
    async fn stage_block(
        &self,
        container: &str,
        object: &str,
        block_id: &BlockId,
        data: Bytes,
    ) -> BlobResult<()> {
        let container_path = self.ensure_container(container).await?;
        let path = self.block_path(container, object, block_id)?;
        Self::write_atomic(&path, &container_path.join(BLOCKS_DIR), &data).await?;
        debug!(path = %path.display(), "staged block");
        Ok(())
    }

    async fn list_uncommitted_blocks(&self, container: &str, object: &str) -> BlobResult<Vec<BlockId>> {
        self.ensure_container(container).await?;
        let dir = self.blocks_path(container, object)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                ids.push(BlockId::from_raw(name));
            }
        }
        ids.sort();
        Ok(ids)
    }

    #[instrument(skip(self, block_ids), fields(blocks = block_ids.len()))]
    async fn commit_block_list(
        &self,
        container: &str,
        object: &str,
        block_ids: &[BlockId],
    ) -> BlobResult<()> {
        let container_path = self.ensure_container(container).await?;
        let target = self.object_path(container, object)?;

        let mut content = Vec::new();
        for id in block_ids {
            let path = self.block_path(container, object, id)?;
            let data = fs::read(&path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BlobError::invalid(format!("unknown block id {id} for {object}"))
                } else {
                    e.into()
                }
            })?;
            content.extend_from_slice(&data);
        }

        Self::write_atomic(&target, &container_path.join(BLOCKS_DIR), &content).await?;

        let blocks = self.blocks_path(container, object)?;
        match fs::remove_dir_all(&blocks).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!(path = %target.display(), bytes = content.len(), "committed block list");
        Ok(())
    }

    async fn copy_object(&self, container: &str, source: &str, destination: &str) -> BlobResult<()> {
        let container_path = self.ensure_container(container).await?;
        let from = self.object_path(container, source)?;
        let to = self.object_path(container, destination)?;
        let data = fs::read(&from).await.map_err(|e| Self::map_missing(e, source))?;
        Self::write_atomic(&to, &container_path.join(BLOCKS_DIR), &data).await
    }

    async fn delete_object(&self, container: &str, object: &str) -> BlobResult<()> {
        self.ensure_container(container).await?;
        let path = self.object_path(container, object)?;
        let blocks = self.blocks_path(container, object)?;

        let removed_blocks = match fs::remove_dir_all(&blocks).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && removed_blocks => Ok(()),
            Err(e) => Err(Self::map_missing(e, object)),
        }
    }

    async fn read_object(&self, container: &str, object: &str) -> BlobResult<ByteStream> {
        self.ensure_container(container).await?;
        let path = self.object_path(container, object)?;
        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| Self::map_missing(e, object))?;
        let stream = async_stream::stream! {
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            loop {
                match file.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => yield Ok(Bytes::copy_from_slice(&buf[..n])),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> BlobResult<Vec<String>> {
        let container_path = self.ensure_container(container).await?;

        let mut names = Vec::new();
        let mut pending = vec![(container_path, String::new())];
        while let Some((dir, relative)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    continue;
                }
                let key = if relative.is_empty() {
                    name
                } else {
                    format!("{relative}/{name}")
                };
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), key));
                } else if file_type.is_file() && key.starts_with(prefix) {
                    names.push(key);
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
