//! Test utilities for integration tests.
//!
//! This module provides mock model providers, multipart body builders and a
//! test harness that wires the full service behind an in-memory router.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use base64::Engine;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Luma, Rgb};

use photo_restorer::cache::{ArtifactStore, ManualClock, MemoryStore, ResultCache};
use photo_restorer::error::{CacheError, ModelError};
use photo_restorer::model::{ModelGateway, ModelProvider, RestorationModel};
use photo_restorer::pipeline::RestoreService;
use photo_restorer::server::{create_router, RouterConfig};
use photo_restorer::tier::TieringStage;

// =============================================================================
// Test Images
// =============================================================================

/// A solid grayscale PNG, the typical "old photo" input.
pub fn gray_png(width: u32, height: u32, value: u8) -> Vec<u8> {
    let img = image::GrayImage::from_pixel(width, height, Luma([value]));
    encode_png(DynamicImage::ImageLuma8(img))
}

/// A solid color PNG.
pub fn color_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, Rgb(rgb));
    encode_png(DynamicImage::ImageRgb8(img))
}

fn encode_png(image: DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Check that a byte slice starts with the PNG signature.
pub fn is_valid_png(data: &[u8]) -> bool {
    data.len() > 8 && data[..4] == [0x89, b'P', b'N', b'G']
}

// =============================================================================
// Multipart Body Builder
// =============================================================================

const BOUNDARY: &str = "test-boundary-7f3a9c";

/// Builds a multipart/form-data body for restore requests.
pub struct MultipartBody {
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Add the image file part.
    pub fn file(mut self, data: &[u8]) -> Self {
        self.buf
            .extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.buf.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\n",
        );
        self.buf.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// Add a plain text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf
            .extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.buf.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// Finish the body and build a POST /restore request.
    pub fn into_request(mut self) -> Request<Body> {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/restore")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(self.buf))
            .unwrap()
    }
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a restore request with just a file and the given flags.
pub fn restore_request(data: &[u8], restore_face: bool, colorize: bool, paid: bool) -> Request<Body> {
    MultipartBody::new()
        .file(data)
        .text("restore_face", if restore_face { "true" } else { "false" })
        .text("colorize", if colorize { "true" } else { "false" })
        .text("paid", if paid { "true" } else { "false" })
        .into_request()
}

/// Collect a response body as JSON.
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Decode the base64 image payload from a restore response.
pub fn decode_image_payload(json: &serde_json::Value) -> Vec<u8> {
    let encoded = json["restored_image"].as_str().unwrap();
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap()
}

// =============================================================================
// Mock Model Provider
// =============================================================================

/// A model that counts invocations and optionally sleeps.
pub struct CountingModel {
    name: &'static str,
    invocations: Arc<AtomicUsize>,
    delay: Duration,
}

impl RestorationModel for CountingModel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, ModelError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        // Nudge the pixels so the output is distinguishable from the input
        let mut rgb = image.to_rgb8();
        for px in rgb.pixels_mut() {
            px.0[0] = px.0[0].saturating_add(10);
        }
        Ok(DynamicImage::ImageRgb8(rgb))
    }
}

/// Provider serving counting models, optionally with inference delay.
pub struct CountingProvider {
    pub invocations: Arc<AtomicUsize>,
    delay: Duration,
}

impl CountingProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            invocations: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }
}

#[async_trait]
impl ModelProvider for CountingProvider {
    async fn load_face_restorer(&self) -> Result<Arc<dyn RestorationModel>, ModelError> {
        Ok(Arc::new(CountingModel {
            name: "face_restorer",
            invocations: self.invocations.clone(),
            delay: self.delay,
        }))
    }

    async fn load_colorizer(&self) -> Result<Arc<dyn RestorationModel>, ModelError> {
        Ok(Arc::new(CountingModel {
            name: "colorizer",
            invocations: self.invocations.clone(),
            delay: self.delay,
        }))
    }
}

/// Provider whose loads always fail, for the 503 path.
pub struct BrokenProvider;

#[async_trait]
impl ModelProvider for BrokenProvider {
    async fn load_face_restorer(&self) -> Result<Arc<dyn RestorationModel>, ModelError> {
        Err(ModelError::Load {
            model: "face_restorer",
            reason: "weights unavailable".to_string(),
        })
    }

    async fn load_colorizer(&self) -> Result<Arc<dyn RestorationModel>, ModelError> {
        Err(ModelError::Load {
            model: "colorizer",
            reason: "weights unavailable".to_string(),
        })
    }
}

/// Store whose writes always fail, for the degraded-persistence path.
pub struct FailingStore;

#[async_trait]
impl ArtifactStore for FailingStore {
    async fn put(&self, name: &str, _data: Bytes) -> Result<(), CacheError> {
        Err(CacheError::Io {
            name: name.to_string(),
            reason: "disk full".to_string(),
        })
    }

    async fn get(&self, _name: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(None)
    }

    async fn remove(&self, _name: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// A router over the real built-in CPU models, for end-to-end checks.
pub fn builtin_router() -> Router {
    let gateway = Arc::new(ModelGateway::new(Arc::new(
        photo_restorer::model::BuiltinModelProvider::new(),
    )));
    let cache = Arc::new(ResultCache::new(
        Duration::from_secs(24 * 3600),
        64,
        Arc::new(photo_restorer::cache::SystemClock),
    ));
    let service = Arc::new(RestoreService::new(
        gateway,
        cache,
        Arc::new(MemoryStore::new()),
        TieringStage::default(),
        2048,
    ));
    create_router(service, RouterConfig::new().with_tracing(false))
}

// =============================================================================
// Test Harness
// =============================================================================

/// The full service wired behind an in-memory router, with handles to the
/// collaborators the tests observe.
pub struct TestApp {
    pub router: Router,
    pub service: Arc<RestoreService>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub invocations: Arc<AtomicUsize>,
}

/// Configuration knobs for [`TestApp`].
pub struct TestAppBuilder {
    ttl: Duration,
    inference_delay: Duration,
    broken_models: bool,
    failing_store: bool,
    payment_url: Option<String>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 3600),
            inference_delay: Duration::ZERO,
            broken_models: false,
            failing_store: false,
            payment_url: None,
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn inference_delay(mut self, delay: Duration) -> Self {
        self.inference_delay = delay;
        self
    }

    pub fn broken_models(mut self) -> Self {
        self.broken_models = true;
        self
    }

    pub fn failing_store(mut self) -> Self {
        self.failing_store = true;
        self
    }

    pub fn payment_url(mut self, url: &str) -> Self {
        self.payment_url = Some(url.to_string());
        self
    }

    pub fn build(self) -> TestApp {
        let provider = Arc::new(CountingProvider::new(self.inference_delay));
        let invocations = provider.invocations.clone();

        let gateway = if self.broken_models {
            Arc::new(ModelGateway::new(Arc::new(BrokenProvider)))
        } else {
            Arc::new(ModelGateway::new(provider))
        };

        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(ResultCache::new(self.ttl, 64, clock.clone()));

        let store = Arc::new(MemoryStore::new());
        let artifact_store: Arc<dyn ArtifactStore> = if self.failing_store {
            Arc::new(FailingStore)
        } else {
            store.clone()
        };

        let service = Arc::new(RestoreService::new(
            gateway,
            cache,
            artifact_store,
            TieringStage::default(),
            2048,
        ));

        let router = create_router(
            service.clone(),
            RouterConfig::new()
                .with_payment_url(self.payment_url)
                .with_tracing(false),
        );

        TestApp {
            router,
            service,
            store,
            clock,
            invocations,
        }
    }
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Build an app with default settings.
    pub fn new() -> Self {
        TestAppBuilder::new().build()
    }

    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::new()
    }

    pub fn model_invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
