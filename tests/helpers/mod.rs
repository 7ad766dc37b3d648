//! Shared test helpers for integration tests.

use std::io::Write;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use tower::ServiceExt;

use labhub_core::config::AppConfig;
use labhub_registry::{CapabilityRegistry, CombinationValidator, InstrumentModelResolver};

/// Multipart boundary used by every test request.
pub const BOUNDARY: &str = "X-LABHUB-TEST-BOUNDARY";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Staging directory, kept alive for the test's duration
    pub upload_dir: tempfile::TempDir,
}

/// A decoded test response
pub struct TestResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Raw body
    pub text: String,
}

impl TestResponse {
    /// Body parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.text).expect("response body is not JSON")
    }
}

impl TestApp {
    /// Create a new test application with an isolated upload directory.
    pub async fn new() -> Self {
        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");

        let mut config = AppConfig::default();
        config.storage.upload_dir = upload_dir.path().display().to_string();

        let registry = Arc::new(CapabilityRegistry::standard());
        registry
            .verify_consistency()
            .expect("standard registry must be consistent");

        let state = labhub_api::AppState {
            validator: Arc::new(CombinationValidator::new(registry)),
            dispatch: Arc::new(labhub_convert::ConverterDispatch::new(
                config.converters.clone(),
                InstrumentModelResolver::new(),
            )),
            temp_store: Arc::new(
                labhub_storage::TempStore::new(upload_dir.path())
                    .await
                    .expect("Failed to init temp store"),
            ),
            config: Arc::new(config),
        };

        Self {
            router: labhub_api::build_router(state),
            upload_dir,
        }
    }

    /// Issue a GET request.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Issue a multipart POST request.
    pub async fn post_multipart(&self, uri: &str, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        TestResponse {
            status,
            text: String::from_utf8_lossy(&bytes).to_string(),
        }
    }

    /// Files currently sitting in the staging directory.
    pub fn staged_files(&self) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(self.upload_dir.path())
            .expect("Failed to read upload dir")
            .map(|entry| entry.expect("bad dir entry").path())
            .collect()
    }
}

/// Incrementally build a multipart/form-data body.
#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    /// Start an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// Append a file field.
    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Close the body.
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// Gzip-compress a payload the way uploaded files arrive.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).expect("gzip write failed");
    encoder.finish().expect("gzip finish failed")
}
