//! HTTP resumable upload sink.
//!
//! Protocol:
//! - `POST {endpoint}` with JSON metadata opens a session; the `Location`
//!   response header is the session URL.
//! - Each chunk is `PUT {session}` with `Content-Range: bytes start-end/total`.
//!   `308` means more bytes are expected (`Range: bytes=0-N` reports what was
//!   persisted), `200`/`201` completes the upload with a JSON `{ "id": ... }`.
//! - Collections live under `{collections_base}/collections`: `GET` lists
//!   them, `POST` creates one, `POST .../{id}/items` adds an item.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ChunkOutcome, CollectionInfo, HttpSinkConfig, RemoteSink, SessionHandle, SinkError,
    UploadMetadata,
};

/// `308 Resume Incomplete` as used by resumable upload services.
const RESUME_INCOMPLETE: u16 = 308;

/// Response body of a completed upload.
#[derive(Debug, Deserialize)]
struct CompletedUpload {
    id: String,
}

#[derive(Debug, Serialize)]
struct CollectionItem<'a> {
    item_id: &'a str,
}

#[derive(Debug, Serialize)]
struct NewCollection<'a> {
    title: &'a str,
    privacy: &'a str,
}

/// Response body of a collection listing.
#[derive(Debug, Deserialize)]
struct CollectionList {
    #[serde(default)]
    items: Vec<CollectionInfo>,
}

/// HTTP resumable upload sink implementation.
pub struct HttpResumableSink {
    client: Client,
    config: HttpSinkConfig,
}

impl HttpResumableSink {
    /// Create a new HTTP sink.
    pub fn new(config: HttpSinkConfig) -> Result<Self, SinkError> {
        // Redirects are disabled so 308 reaches us instead of being followed.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SinkError::Protocol(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    fn collections_base(&self) -> &str {
        self.config
            .collections_endpoint
            .as_deref()
            .unwrap_or(&self.config.endpoint)
            .trim_end_matches('/')
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.access_token.as_deref() {
            Some(token) if !token.is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SinkError> {
        self.authorize(request).send().await.map_err(map_transport_error)
    }
}

/// Map a reqwest transport failure onto the sink error taxonomy.
fn map_transport_error(e: reqwest::Error) -> SinkError {
    if e.is_timeout() {
        SinkError::Timeout
    } else if e.is_builder() {
        SinkError::InvalidRequest(e.to_string())
    } else if e.is_decode() {
        SinkError::Protocol(e.to_string())
    } else {
        SinkError::Connection(e.to_string())
    }
}

/// Format the `Content-Range` header for a chunk.
pub(crate) fn content_range(offset: u64, len: usize, total: u64) -> String {
    if len == 0 {
        format!("bytes */{}", total)
    } else {
        format!("bytes {}-{}/{}", offset, offset + len as u64 - 1, total)
    }
}

/// Parse a `Range: bytes=0-N` header into the next expected offset (`N + 1`).
pub(crate) fn parse_range_header(value: &str) -> Option<u64> {
    let range = value.trim().strip_prefix("bytes=")?;
    let (_, end) = range.split_once('-')?;
    end.trim().parse::<u64>().ok().map(|end| end + 1)
}

async fn error_from_response(response: Response) -> SinkError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    SinkError::from_status(status, &body)
}

#[async_trait]
impl RemoteSink for HttpResumableSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn begin_upload(
        &self,
        metadata: &UploadMetadata,
        total_bytes: u64,
    ) -> Result<SessionHandle, SinkError> {
        let request = self
            .client
            .post(self.endpoint())
            .query(&[("uploadType", "resumable")])
            .header("X-Upload-Content-Length", total_bytes)
            .header("X-Upload-Content-Type", "application/octet-stream")
            .json(metadata);

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                SinkError::Protocol("upload session response has no Location header".to_string())
            })?;

        debug!("Opened resumable session for '{}'", metadata.title);
        Ok(SessionHandle::new(location))
    }

    async fn send_chunk(
        &self,
        session: &SessionHandle,
        chunk: &[u8],
        offset: u64,
        total_bytes: u64,
    ) -> Result<ChunkOutcome, SinkError> {
        let request = self
            .client
            .put(&session.id)
            .header(header::CONTENT_RANGE, content_range(offset, chunk.len(), total_bytes))
            .body(chunk.to_vec());

        let response = self.send(request).await?;
        let status = response.status();

        if status.as_u16() == RESUME_INCOMPLETE {
            // No Range header means nothing has been persisted yet
            let acknowledged = response
                .headers()
                .get(header::RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_range_header)
                .unwrap_or(0);
            return Ok(ChunkOutcome::Continue { acknowledged });
        }

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let completed: CompletedUpload = response
                .json()
                .await
                .map_err(|e| SinkError::Protocol(format!("invalid completion body: {}", e)))?;
            return Ok(ChunkOutcome::Complete {
                remote_id: completed.id,
            });
        }

        Err(error_from_response(response).await)
    }

    async fn add_to_collection(
        &self,
        remote_id: &str,
        collection: &str,
    ) -> Result<(), SinkError> {
        let url = format!("{}/collections/{}/items", self.collections_base(), collection);
        let request = self
            .client
            .post(&url)
            .json(&CollectionItem { item_id: remote_id });

        let response = self.send(request).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, SinkError> {
        let url = format!("{}/collections", self.collections_base());
        let response = self.send(self.client.get(&url)).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let list: CollectionList = response
            .json()
            .await
            .map_err(|e| SinkError::Protocol(format!("invalid collection list: {}", e)))?;
        debug!("Listed {} collections", list.items.len());
        Ok(list.items)
    }

    async fn create_collection(
        &self,
        title: &str,
        privacy: &str,
    ) -> Result<CollectionInfo, SinkError> {
        let url = format!("{}/collections", self.collections_base());
        let request = self
            .client
            .post(&url)
            .json(&NewCollection { title, privacy });

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| SinkError::Protocol(format!("invalid created collection: {}", e)))
    }
}
