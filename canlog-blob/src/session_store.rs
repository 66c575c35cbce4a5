use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::{BlobError, BlobResult, SessionHandle, SessionId, UploadSession, UploadSessionStore};

/// In-memory session table with one lock per session
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<SessionId, SessionHandle>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl UploadSessionStore for MemorySessionStore {
    async fn create(&self, session: UploadSession) -> BlobResult<SessionHandle> {
        match self.sessions.entry(session.session_id.clone()) {
            Entry::Occupied(_) => Err(BlobError::invalid(format!(
                "upload session {} already exists",
                session.session_id
            ))),
            Entry::Vacant(slot) => {
                let handle = Arc::new(tokio::sync::Mutex::new(session));
                slot.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    async fn get(&self, session_id: &SessionId) -> BlobResult<SessionHandle> {
        self.sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BlobError::not_found(format!("upload session {session_id}")))
    }

    async fn remove(&self, session_id: &SessionId) -> BlobResult<()> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn list(&self) -> BlobResult<Vec<SessionId>> {
        let mut ids: Vec<SessionId> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn session(id: &str) -> UploadSession {
        UploadSession::new(
            SessionId::from_string(id.to_string()),
            "logs".into(),
            "can".into(),
            format!("can/{id}.log"),
            PathBuf::from(format!("/tmp/{id}.part")),
        )
    }

    #[tokio::test]
    async fn handles_share_state() {
        let store = MemorySessionStore::new();
        let created = store.create(session("a")).await.unwrap();
        created.lock().await.record_staged("0");

        let fetched = store.get(&SessionId::from_string("a".into())).await.unwrap();
        assert_eq!(fetched.lock().await.chunks, vec!["0".to_string()]);
        assert!(Arc::ptr_eq(&created, &fetched));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemorySessionStore::new();
        store.create(session("a")).await.unwrap();
        assert!(store.create(session("a")).await.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_and_removed_sessions_are_not_found() {
        let store = MemorySessionStore::new();
        let id = SessionId::from_string("a".into());
        assert!(store.get(&id).await.unwrap_err().is_not_found());

        store.create(session("a")).await.unwrap();
        store.remove(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap_err().is_not_found());
        assert!(store.list().await.unwrap().is_empty());
    }
}
