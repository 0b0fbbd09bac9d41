//! Mock image vendor server for integration tests
//!
//! Serves minimal versions of the Gemini, OpenAI and Topaz endpoints the
//! adapters call, returning canned image bytes

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio_util::sync::CancellationToken;

/// API key every mocked endpoint accepts
pub const TEST_KEY: &str = "test-key";

pub const GEMINI_IMAGE: &[u8] = b"gemini-image";
pub const OPENAI_IMAGE: &[u8] = b"openai-image";
pub const OPENAI_EDITED: &[u8] = b"openai-edited";
pub const UPSCALED_IMAGE: &[u8] = b"upscaled-image";

/// Mock vendor backend with per-endpoint counters
pub struct MockVendor {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockVendorState>,
}

struct MockVendorState {
    addr: SocketAddr,
    gemini_count: AtomicU32,
    generation_count: AtomicU32,
    edit_count: AtomicU32,
    submit_count: AtomicU32,
    poll_count: AtomicU32,
    download_count: AtomicU32,
    /// Number of image requests to fail with 500 before succeeding
    fail_count: AtomicU32,
    /// Status polls answered with `processing` before completing
    pending_polls: u32,
    /// Report the upscale job as failed instead of completing it
    fail_job: bool,
}

#[derive(Default)]
pub struct MockOptions {
    pub fail_count: u32,
    pub pending_polls: u32,
    pub fail_job: bool,
}

impl MockVendor {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(MockOptions::default()).await
    }

    /// Start a mock server that fails the first `n` image requests with 500
    pub async fn start_failing(n: u32) -> anyhow::Result<Self> {
        Self::start_with(MockOptions {
            fail_count: n,
            ..MockOptions::default()
        })
        .await
    }

    pub async fn start_with(options: MockOptions) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(MockVendorState {
            addr,
            gemini_count: AtomicU32::new(0),
            generation_count: AtomicU32::new(0),
            edit_count: AtomicU32::new(0),
            submit_count: AtomicU32::new(0),
            poll_count: AtomicU32::new(0),
            download_count: AtomicU32::new(0),
            fail_count: AtomicU32::new(options.fail_count),
            pending_polls: options.pending_polls,
            fail_job: options.fail_job,
        });

        let app = Router::new()
            .route("/v1beta/models/{*model}", routing::post(handle_generate_content))
            .route("/v1/images/generations", routing::post(handle_generations))
            .route("/v1/images/edits", routing::post(handle_edits))
            .route("/image/v1/enhance/async", routing::post(handle_submit))
            .route("/image/v1/enhance/async/{id}", routing::get(handle_status))
            .route("/downloads/{id}", routing::get(handle_download))
            .with_state(Arc::clone(&state));

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for the Gemini adapter
    pub fn gemini_url(&self) -> String {
        format!("http://{}/v1beta", self.addr)
    }

    /// Base URL for the OpenAI adapter
    pub fn openai_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Base URL for the Topaz adapter
    pub fn topaz_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn gemini_count(&self) -> u32 {
        self.state.gemini_count.load(Ordering::Relaxed)
    }

    pub fn generation_count(&self) -> u32 {
        self.state.generation_count.load(Ordering::Relaxed)
    }

    pub fn edit_count(&self) -> u32 {
        self.state.edit_count.load(Ordering::Relaxed)
    }

    pub fn submit_count(&self) -> u32 {
        self.state.submit_count.load(Ordering::Relaxed)
    }

    pub fn poll_count(&self) -> u32 {
        self.state.poll_count.load(Ordering::Relaxed)
    }

    pub fn download_count(&self) -> u32 {
        self.state.download_count.load(Ordering::Relaxed)
    }
}

impl Drop for MockVendor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl MockVendorState {
    /// Consume one scripted failure, if any are left
    fn should_fail(&self) -> bool {
        self.fail_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn header_is(headers: &HeaderMap, name: &str, expected: &str) -> bool {
    headers.get(name).and_then(|value| value.to_str().ok()) == Some(expected)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "invalid api key").into_response()
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

fn openai_image(data: &[u8]) -> Response {
    Json(serde_json::json!({
        "created": 1_700_000_000,
        "data": [{ "b64_json": STANDARD.encode(data) }]
    }))
    .into_response()
}

// -- Gemini --

async fn handle_generate_content(
    State(state): State<Arc<MockVendorState>>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.gemini_count.fetch_add(1, Ordering::Relaxed);

    if !header_is(&headers, "x-goog-api-key", TEST_KEY) {
        return unauthorized();
    }
    if state.should_fail() {
        return server_error();
    }
    if !model.ends_with(":generateContent") || body["contents"][0]["parts"][0]["text"].is_null() {
        return (StatusCode::BAD_REQUEST, "malformed request").into_response();
    }

    Json(serde_json::json!({
        "candidates": [{
            "content": {
                "parts": [
                    { "text": "here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": STANDARD.encode(GEMINI_IMAGE) } }
                ]
            }
        }]
    }))
    .into_response()
}

// -- OpenAI --

async fn handle_generations(
    State(state): State<Arc<MockVendorState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.generation_count.fetch_add(1, Ordering::Relaxed);

    if !header_is(&headers, "authorization", &format!("Bearer {TEST_KEY}")) {
        return unauthorized();
    }
    if state.should_fail() {
        return server_error();
    }
    if body["model"].is_null() || body["size"].is_null() {
        return (StatusCode::BAD_REQUEST, "model and size are required").into_response();
    }

    openai_image(OPENAI_IMAGE)
}

async fn handle_edits(State(state): State<Arc<MockVendorState>>, headers: HeaderMap, body: Bytes) -> Response {
    state.edit_count.fetch_add(1, Ordering::Relaxed);

    if !header_is(&headers, "authorization", &format!("Bearer {TEST_KEY}")) {
        return unauthorized();
    }
    if state.should_fail() {
        return server_error();
    }
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "image is required").into_response();
    }

    openai_image(OPENAI_EDITED)
}

// -- Topaz --

async fn handle_submit(State(state): State<Arc<MockVendorState>>, headers: HeaderMap) -> Response {
    state.submit_count.fetch_add(1, Ordering::Relaxed);

    if !header_is(&headers, "x-api-key", TEST_KEY) {
        return unauthorized();
    }

    Json(serde_json::json!({ "process_id": "job-1", "source_id": "src-1", "eta": 1 })).into_response()
}

async fn handle_status(
    State(state): State<Arc<MockVendorState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let polls = state.poll_count.fetch_add(1, Ordering::Relaxed) + 1;

    if !header_is(&headers, "x-api-key", TEST_KEY) {
        return unauthorized();
    }

    if polls <= state.pending_polls {
        return Json(serde_json::json!({ "state": "processing" })).into_response();
    }

    if state.fail_job {
        return Json(serde_json::json!({ "state": "failed", "error": "source image too small" })).into_response();
    }

    Json(serde_json::json!({
        "state": "completed",
        "output_url": format!("http://{}/downloads/{id}", state.addr),
        "output_width": 4096,
        "output_height": 2304
    }))
    .into_response()
}

async fn handle_download(State(state): State<Arc<MockVendorState>>) -> impl IntoResponse {
    state.download_count.fetch_add(1, Ordering::Relaxed);
    UPSCALED_IMAGE
}
