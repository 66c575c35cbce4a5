use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::{ServiceError, ServiceResult};

/// Fire-and-forget notification channel for processed summaries
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Create the queue if it does not exist yet
    async fn ensure_queue(&self, queue: &str) -> ServiceResult<()>;

    /// Enqueue a message; no acknowledgement is awaited
    async fn publish(&self, queue: &str, message: Bytes) -> ServiceResult<()>;
}

/// In-process publisher keeping messages per queue
#[derive(Clone, Default)]
pub struct MemoryPublisher {
    queues: Arc<Mutex<HashMap<String, VecDeque<Bytes>>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every message queued so far, oldest first
    pub fn drain(&self, queue: &str) -> Vec<Bytes> {
        self.queues
            .lock()
            .get_mut(queue)
            .map(|messages| messages.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, queue: &str) -> usize {
        self.queues.lock().get(queue).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl NotificationPublisher for MemoryPublisher {
    async fn ensure_queue(&self, queue: &str) -> ServiceResult<()> {
        self.queues.lock().entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn publish(&self, queue: &str, message: Bytes) -> ServiceResult<()> {
        let mut queues = self.queues.lock();
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| ServiceError::publish(queue, format!("queue {queue} does not exist")))?;
        debug!(queue, bytes = message.len(), "queued message");
        messages.push_back(message);
        Ok(())
    }
}
