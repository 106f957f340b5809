//! Mock remote sink for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::sink::{
    ChunkOutcome, CollectionInfo, RemoteSink, SessionHandle, SinkError, UploadMetadata,
};

/// A recorded `begin_upload` call.
#[derive(Debug, Clone)]
pub struct RecordedSession {
    pub id: String,
    pub metadata: UploadMetadata,
    pub total_bytes: u64,
}

/// A recorded `send_chunk` call.
#[derive(Debug, Clone)]
pub struct RecordedChunk {
    pub session_id: String,
    pub offset: u64,
    pub len: usize,
    /// False if the call returned a scripted error.
    pub accepted: bool,
}

/// Mock implementation of the RemoteSink trait.
///
/// Provides controllable behavior for testing:
/// - Track sessions and chunk attempts for assertions
/// - Script transient or fatal failures at a byte offset
/// - Acknowledge less than a full chunk
/// - Slow each chunk down
/// - Seed collections and record the ones created
///
/// Uploads complete with remote ids `remote-1`, `remote-2`, ... in session order.
/// Created collections get ids `collection-1`, `collection-2`, ...
#[derive(Debug, Default)]
pub struct MockRemoteSink {
    sessions: Arc<RwLock<Vec<RecordedSession>>>,
    attempts: Arc<RwLock<Vec<RecordedChunk>>>,
    /// Errors returned, in order, for chunks sent at an offset.
    chunk_failures: Arc<RwLock<HashMap<u64, VecDeque<SinkError>>>>,
    /// Titles whose sessions are refused.
    begin_failures: Arc<RwLock<HashMap<String, SinkError>>>,
    ack_limit: Arc<RwLock<Option<u64>>>,
    chunk_delay: Arc<RwLock<Option<Duration>>>,
    collection_adds: Arc<RwLock<Vec<(String, String)>>>,
    collection_error: Arc<RwLock<Option<SinkError>>>,
    collections: Arc<RwLock<Vec<CollectionInfo>>>,
    created_collections: Arc<RwLock<Vec<(String, String)>>>,
    list_error: Arc<RwLock<Option<SinkError>>>,
    create_error: Arc<RwLock<Option<SinkError>>>,
    list_calls: AtomicU32,
    session_counter: AtomicU32,
    collection_counter: AtomicU32,
}

impl MockRemoteSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `errors` in turn for chunks sent at `offset`, then succeed.
    pub async fn fail_chunk_at(&self, offset: u64, errors: Vec<SinkError>) {
        self.chunk_failures
            .write()
            .await
            .insert(offset, errors.into_iter().collect());
    }

    /// Refuse every session for uploads with this title.
    pub async fn fail_begin_for(&self, title: &str, error: SinkError) {
        self.begin_failures
            .write()
            .await
            .insert(title.to_string(), error);
    }

    /// Acknowledge at most `limit` bytes per chunk.
    pub async fn set_ack_limit(&self, limit: Option<u64>) {
        *self.ack_limit.write().await = limit;
    }

    /// Sleep this long inside every `send_chunk`.
    pub async fn set_chunk_delay(&self, delay: Duration) {
        *self.chunk_delay.write().await = Some(delay);
    }

    pub async fn set_collection_error(&self, error: Option<SinkError>) {
        *self.collection_error.write().await = error;
    }

    /// Seed an existing collection.
    pub async fn add_collection(&self, id: &str, title: &str) {
        self.collections.write().await.push(CollectionInfo {
            id: id.to_string(),
            title: title.to_string(),
            item_count: 0,
        });
    }

    pub async fn set_list_error(&self, error: Option<SinkError>) {
        *self.list_error.write().await = error;
    }

    pub async fn set_create_error(&self, error: Option<SinkError>) {
        *self.create_error.write().await = error;
    }

    /// `(title, privacy)` of every collection created through the sink.
    pub async fn created_collections(&self) -> Vec<(String, String)> {
        self.created_collections.read().await.clone()
    }

    /// Number of `list_collections` calls.
    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub async fn sessions(&self) -> Vec<RecordedSession> {
        self.sessions.read().await.clone()
    }

    /// Titles of every upload that reached the sink.
    pub async fn uploaded_titles(&self) -> Vec<String> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|s| s.metadata.title.clone())
            .collect()
    }

    /// Every chunk attempt, including failed ones.
    pub async fn chunk_attempts(&self) -> Vec<RecordedChunk> {
        self.attempts.read().await.clone()
    }

    /// Accepted chunks only.
    pub async fn chunks(&self) -> Vec<RecordedChunk> {
        self.attempts
            .read()
            .await
            .iter()
            .filter(|c| c.accepted)
            .cloned()
            .collect()
    }

    pub async fn collection_adds(&self) -> Vec<(String, String)> {
        self.collection_adds.read().await.clone()
    }

    async fn next_failure(&self, offset: u64) -> Option<SinkError> {
        let mut failures = self.chunk_failures.write().await;
        let queue = failures.get_mut(&offset)?;
        let error = queue.pop_front();
        if queue.is_empty() {
            failures.remove(&offset);
        }
        error
    }
}

#[async_trait]
impl RemoteSink for MockRemoteSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn begin_upload(
        &self,
        metadata: &UploadMetadata,
        total_bytes: u64,
    ) -> Result<SessionHandle, SinkError> {
        if let Some(error) = self.begin_failures.read().await.get(&metadata.title) {
            return Err(error.clone());
        }

        let n = self.session_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("session-{n}");
        self.sessions.write().await.push(RecordedSession {
            id: id.clone(),
            metadata: metadata.clone(),
            total_bytes,
        });
        Ok(SessionHandle::new(id))
    }

    async fn send_chunk(
        &self,
        session: &SessionHandle,
        chunk: &[u8],
        offset: u64,
        total_bytes: u64,
    ) -> Result<ChunkOutcome, SinkError> {
        let delay = *self.chunk_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut record = RecordedChunk {
            session_id: session.id.clone(),
            offset,
            len: chunk.len(),
            accepted: false,
        };

        if let Some(error) = self.next_failure(offset).await {
            self.attempts.write().await.push(record);
            return Err(error);
        }

        let known = self
            .sessions
            .read()
            .await
            .iter()
            .any(|s| s.id == session.id);
        if !known {
            self.attempts.write().await.push(record);
            return Err(SinkError::Protocol(format!("unknown session {}", session.id)));
        }

        let ack_limit = *self.ack_limit.read().await;
        let accepted = ack_limit.map_or(chunk.len() as u64, |limit| limit.min(chunk.len() as u64));
        let acknowledged = offset + accepted;

        record.accepted = true;
        self.attempts.write().await.push(record);

        if acknowledged >= total_bytes {
            let n = session.id.trim_start_matches("session-");
            Ok(ChunkOutcome::Complete {
                remote_id: format!("remote-{n}"),
            })
        } else {
            Ok(ChunkOutcome::Continue { acknowledged })
        }
    }

    async fn add_to_collection(&self, remote_id: &str, collection: &str) -> Result<(), SinkError> {
        if let Some(error) = self.collection_error.read().await.clone() {
            return Err(error);
        }
        self.collection_adds
            .write()
            .await
            .push((remote_id.to_string(), collection.to_string()));
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, SinkError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.list_error.read().await.clone() {
            return Err(error);
        }
        Ok(self.collections.read().await.clone())
    }

    async fn create_collection(
        &self,
        title: &str,
        privacy: &str,
    ) -> Result<CollectionInfo, SinkError> {
        if let Some(error) = self.create_error.read().await.clone() {
            return Err(error);
        }

        let n = self.collection_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let created = CollectionInfo {
            id: format!("collection-{n}"),
            title: title.to_string(),
            item_count: 0,
        };
        self.collections.write().await.push(created.clone());
        self.created_collections
            .write()
            .await
            .push((title.to_string(), privacy.to_string()));
        Ok(created)
    }
}
