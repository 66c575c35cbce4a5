use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::{BlobResult, ByteStream, SessionId};

/// Append-only local file mirroring the bytes received for one upload session.
///
/// The buffer is the source the header decoder reads after commit, so an append
/// never truncates what earlier chunks wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStagingBuffer {
    path: PathBuf,
}

impl LocalStagingBuffer {
    /// Create an empty buffer file for a session inside `dir`
    pub async fn create(dir: &Path, session_id: &SessionId) -> BlobResult<Self> {
        fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.part", session_id));
        fs::File::create(&path).await?;
        Ok(Self { path })
    }

    /// Re-attach to an existing buffer file
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append bytes and flush them to disk
    pub async fn append(&self, data: &Bytes) -> BlobResult<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    /// Replace the buffer content with `content`, returning the bytes written.
    ///
    /// The new content is written beside the buffer and renamed over it, so a failed
    /// rebuild leaves the previous bytes in place.
    pub async fn replace_with(&self, mut content: ByteStream) -> BlobResult<u64> {
        let mut scratch = self.path.clone().into_os_string();
        scratch.push(".rebuild");
        let scratch = PathBuf::from(scratch);

        let written = async {
            let mut file = fs::File::create(&scratch).await?;
            let mut written = 0u64;
            while let Some(chunk) = content.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.sync_all().await?;
            Ok::<_, std::io::Error>(written)
        }
        .await;

        match written {
            Ok(written) => {
                fs::rename(&scratch, &self.path).await?;
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&scratch).await;
                Err(e.into())
            }
        }
    }

    pub async fn read_all(&self) -> BlobResult<Bytes> {
        Ok(Bytes::from(fs::read(&self.path).await?))
    }

    pub async fn len(&self) -> BlobResult<u64> {
        Ok(fs::metadata(&self.path).await?.len())
    }

    /// Remove the buffer file. Missing files are not an error.
    pub async fn remove(&self) -> BlobResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_accumulate_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let id = SessionId::from_string("s1".into());
        let buffer = LocalStagingBuffer::create(dir.path(), &id).await.unwrap();
        assert_eq!(buffer.path(), dir.path().join("s1.part"));
        assert_eq!(buffer.len().await.unwrap(), 0);

        buffer.append(&Bytes::from_static(b"AAAA")).await.unwrap();
        buffer.append(&Bytes::from_static(b"BBBB")).await.unwrap();
        assert_eq!(&buffer.read_all().await.unwrap()[..], b"AAAABBBB");

        buffer.remove().await.unwrap();
        buffer.remove().await.unwrap();
        assert!(!buffer.path().exists());
    }

    #[tokio::test]
    async fn replace_with_overwrites_arrival_order_content() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = LocalStagingBuffer::create(dir.path(), &SessionId::new()).await.unwrap();
        buffer.append(&Bytes::from_static(b"BBBBAAAA")).await.unwrap();

        let ordered = crate::store::once_stream(Bytes::from_static(b"AAAABBBB"));
        assert_eq!(buffer.replace_with(ordered).await.unwrap(), 8);
        assert_eq!(&buffer.read_all().await.unwrap()[..], b"AAAABBBB");
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = LocalStagingBuffer::create(dir.path(), &SessionId::new()).await.unwrap();
        buffer.append(&Bytes::from_static(b"AAAA")).await.unwrap();

        let broken: ByteStream = Box::pin(futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"XX")),
            Err(std::io::Error::other("connection reset")),
        ]));
        assert!(buffer.replace_with(broken).await.is_err());
        assert_eq!(&buffer.read_all().await.unwrap()[..], b"AAAA");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn append_to_removed_buffer_fails_without_recreating() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = LocalStagingBuffer::create(dir.path(), &SessionId::new()).await.unwrap();
        buffer.remove().await.unwrap();
        assert!(buffer.append(&Bytes::from_static(b"x")).await.is_err());
        assert!(!buffer.path().exists());
    }
}
