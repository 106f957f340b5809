//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! backed by a real orchestrator and a mock remote sink, so uploads run end
//! to end without network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use chunkline_core::{
    create_audit_system, testing::MockRemoteSink, transfer::RetryConfig, ArchiveConfig,
    CollectionConfig, CollectionHook, Config, HttpSinkConfig, MemoryAuditStore,
    OrchestratorConfig, PostUploadHook, ServerConfig, TransferConfig, TransferEngine,
    UploadOrchestrator,
};

/// Re-export fixtures for test convenience
pub use chunkline_core::testing::fixtures;

/// Test fixture for API testing with a mock sink.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_start_batch() {
///     let fixture = TestFixture::new();
///     let path = fixture.media_file("a.mp4", 1024);
///
///     let response = fixture.post("/api/v1/uploads", fixture.batch_body(&[path])).await;
///     assert_eq!(response.status, StatusCode::ACCEPTED);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock sink - script failures and inspect uploads
    pub sink: Arc<MockRemoteSink>,
    /// Orchestrator behind the router
    pub orchestrator: Arc<UploadOrchestrator>,
    /// Operation log served by `/api/v1/audit`
    pub audit_store: Arc<MemoryAuditStore>,
    /// Temporary directory for media files
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with fast retry and debounce settings.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let sink = Arc::new(MockRemoteSink::new());

        let config = Config {
            sink: HttpSinkConfig {
                access_token: Some("test-token".to_string()),
                ..HttpSinkConfig::new("http://127.0.0.1:9/upload")
            },
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            upload: TransferConfig {
                chunk_size: 256 * 1024,
                retry: RetryConfig {
                    max_retries: 3,
                    initial_backoff_ms: 5,
                },
                ..Default::default()
            },
            orchestrator: OrchestratorConfig {
                inter_job_delay_ms: 5,
                ..Default::default()
            },
            archive: ArchiveConfig::default(),
            collections: CollectionConfig {
                auto_create: true,
                ..Default::default()
            },
        };

        let audit_store = Arc::new(MemoryAuditStore::new(1000));
        let (audit_handle, audit_writer) = create_audit_system(audit_store.clone(), 100);
        tokio::spawn(audit_writer.run());

        let engine = Arc::new(TransferEngine::new(sink.clone(), config.upload.clone()));
        let hooks: Vec<Arc<dyn PostUploadHook>> = vec![Arc::new(
            CollectionHook::new(sink.clone(), &config.collections)
                .with_audit(audit_handle.clone()),
        )];
        let orchestrator = Arc::new(
            UploadOrchestrator::new(config.orchestrator.clone(), engine, hooks)
                .with_audit(audit_handle),
        );

        let state = Arc::new(chunkline_server::state::AppState::new(
            config,
            Arc::clone(&orchestrator),
            audit_store.clone(),
        ));
        let router = chunkline_server::api::create_router(state);

        Self {
            router,
            sink,
            orchestrator,
            audit_store,
            temp_dir,
        }
    }

    /// Write a media file into the fixture directory.
    pub fn media_file(&self, name: &str, size: usize) -> std::path::PathBuf {
        fixtures::write_media_file(self.temp_dir.path(), name, size)
    }

    /// JSON body for `POST /api/v1/uploads`.
    pub fn batch_body(&self, paths: &[std::path::PathBuf]) -> Value {
        let uploads: Vec<Value> = paths
            .iter()
            .map(|p| {
                json!({
                    "source_path": p,
                    "title": p.file_stem().unwrap().to_string_lossy(),
                })
            })
            .collect();
        json!({ "uploads": uploads })
    }

    /// Poll `/api/v1/audit{query}` until it reports at least `total` events.
    pub async fn wait_for_audit(&self, query: &str, total: i64) -> TestResponse {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            let response = self.get(&format!("/api/v1/audit{query}")).await;
            if response.body["total"].as_i64().unwrap_or(0) >= total
                || std::time::Instant::now() > deadline
            {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait for the running batch to drain.
    pub async fn wait_idle(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.orchestrator.wait_idle())
            .await
            .expect("batch did not finish in time");
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder()
            .method(method)
            .uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
