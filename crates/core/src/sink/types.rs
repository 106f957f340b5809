//! Types for remote sink operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the remote sink.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Rate limited by remote service")]
    TooManyRequests,

    #[error("Remote acknowledged no new bytes at offset {offset}")]
    Stalled { offset: u64 },

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl SinkError {
    /// Whether retrying the same request may succeed.
    ///
    /// Network blips, 5xx responses, 408/429 and stalled acknowledgements are
    /// transient. Auth, permission, quota and malformed requests are fatal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SinkError::Timeout
                | SinkError::Connection(_)
                | SinkError::Server { .. }
                | SinkError::TooManyRequests
                | SinkError::Stalled { .. }
        )
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SinkError::Timeout => "timeout",
            SinkError::Connection(_) => "connection",
            SinkError::Server { .. } => "server",
            SinkError::TooManyRequests => "too_many_requests",
            SinkError::Stalled { .. } => "stalled",
            SinkError::Unauthorized(_) => "unauthorized",
            SinkError::Forbidden(_) => "forbidden",
            SinkError::QuotaExceeded(_) => "quota_exceeded",
            SinkError::InvalidRequest(_) => "invalid_request",
            SinkError::Protocol(_) => "protocol",
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message: String = body.chars().take(200).collect();
        match status {
            408 => SinkError::Timeout,
            429 => SinkError::TooManyRequests,
            401 => SinkError::Unauthorized(message),
            403 if body.to_ascii_lowercase().contains("quota") => {
                SinkError::QuotaExceeded(message)
            }
            403 => SinkError::Forbidden(message),
            500..=599 => SinkError::Server { status, message },
            _ => SinkError::InvalidRequest(format!("HTTP {}: {}", status, message)),
        }
    }
}

/// Metadata sent when opening a resumable upload session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub privacy: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Opaque handle to an open resumable session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    /// Session identifier; the session URL for HTTP sinks.
    pub id: String,
}

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Result of sending one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// The remote side persisted bytes up to (excluding) `acknowledged`.
    Continue { acknowledged: u64 },
    /// The upload is complete and the remote side assigned an identifier.
    Complete { remote_id: String },
}

/// A collection (playlist) known to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub item_count: u64,
}

/// A remote media service accepting resumable uploads.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    /// Returns the name of this sink implementation.
    fn name(&self) -> &str;

    /// Open a resumable upload session for `total_bytes` bytes.
    async fn begin_upload(
        &self,
        metadata: &UploadMetadata,
        total_bytes: u64,
    ) -> Result<SessionHandle, SinkError>;

    /// Send `chunk` starting at byte `offset` of the upload.
    async fn send_chunk(
        &self,
        session: &SessionHandle,
        chunk: &[u8],
        offset: u64,
        total_bytes: u64,
    ) -> Result<ChunkOutcome, SinkError>;

    /// Associate an uploaded item with a collection (playlist) by id.
    async fn add_to_collection(&self, remote_id: &str, collection: &str)
        -> Result<(), SinkError>;

    /// Every collection owned by the authenticated account.
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, SinkError>;

    /// Create an empty collection titled `title`.
    async fn create_collection(
        &self,
        title: &str,
        privacy: &str,
    ) -> Result<CollectionInfo, SinkError>;
}
