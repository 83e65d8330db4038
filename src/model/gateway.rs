//! Model gateway: lazy loading and invocation of the inference models.
//!
//! Each model is loaded at most once per process lifetime while healthy. The
//! load state is an explicit machine:
//!
//! ```text
//! Unloaded ──► Loading ──► Ready
//!                 │          ▲
//!                 ▼          │ (retried on next call)
//!               Failed ──────┘
//! ```
//!
//! A failed load is not cached as permanently broken: the next caller that
//! observes `Failed` becomes the new loader. Concurrent callers that observe
//! `Loading` wait for the leader instead of duplicating the one-time
//! download/initialization cost.
//!
//! Inference itself is CPU-bound and runs on the blocking thread pool so a
//! slow model call never stalls the request-accepting path.

use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::error::ModelError;

// =============================================================================
// Options
// =============================================================================

/// Which restoration steps to run for a request.
///
/// The flags participate in the cache fingerprint: the same image with
/// different options is a different cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RestoreOptions {
    /// Run the face restoration model
    pub restore_face: bool,

    /// Run the colorization model
    pub colorize: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            restore_face: true,
            colorize: true,
        }
    }
}

// =============================================================================
// Model Traits
// =============================================================================

/// A loaded inference model.
///
/// Implementations are treated as pure functions of the input image: same
/// input, same output. They may be slow; the gateway is responsible for
/// keeping them off the async runtime.
pub trait RestorationModel: Send + Sync {
    /// Stable model name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Run inference on one image.
    fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, ModelError>;
}

/// Factory for the two restoration models.
///
/// This is the seam to the external model libraries: the server binary plugs
/// in the built-in CPU implementations, tests plug in mocks. Loading may
/// incur a one-time download/initialization cost.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn load_face_restorer(&self) -> Result<Arc<dyn RestorationModel>, ModelError>;

    async fn load_colorizer(&self) -> Result<Arc<dyn RestorationModel>, ModelError>;
}

// =============================================================================
// Load State
// =============================================================================

/// Identifies one of the two model slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    FaceRestore,
    Colorize,
}

impl ModelKind {
    /// Stable slot name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::FaceRestore => "face_restorer",
            ModelKind::Colorize => "colorizer",
        }
    }
}

/// Lifecycle state of one model slot.
pub enum LoadState {
    /// Never attempted
    Unloaded,
    /// A load is in flight; observers wait on the slot's notify
    Loading,
    /// Loaded and reusable for the rest of the process lifetime
    Ready(Arc<dyn RestorationModel>),
    /// Last attempt failed; the next caller re-attempts the load
    Failed(String),
}

impl std::fmt::Debug for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Unloaded => f.write_str("Unloaded"),
            LoadState::Loading => f.write_str("Loading"),
            LoadState::Ready(m) => write!(f, "Ready({})", m.name()),
            LoadState::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

/// One lazily initialized model slot.
struct ModelSlot {
    state: Mutex<LoadState>,
    notify: Notify,
}

impl ModelSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(LoadState::Unloaded),
            notify: Notify::new(),
        }
    }

    async fn is_ready(&self) -> bool {
        matches!(*self.state.lock().await, LoadState::Ready(_))
    }
}

// =============================================================================
// Model Gateway
// =============================================================================

/// Gateway to the restoration models.
///
/// Owns the per-model load state machines and runs inference on the blocking
/// pool. Shared across requests via `Arc`.
pub struct ModelGateway {
    provider: Arc<dyn ModelProvider>,
    face: ModelSlot,
    colorizer: ModelSlot,
}

impl ModelGateway {
    /// Create a gateway backed by the given provider.
    ///
    /// No model is loaded until the first call that needs it (or
    /// [`warm_up`](Self::warm_up)).
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            face: ModelSlot::new(),
            colorizer: ModelSlot::new(),
        }
    }

    /// Run the requested restoration steps on one image.
    ///
    /// Face restoration runs first, then colorization, matching the original
    /// processing order. With both flags off the image passes through
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Load`] if a required model cannot be loaded
    /// - [`ModelError::Inference`] if a model fails on this input
    pub async fn infer(
        &self,
        image: DynamicImage,
        options: RestoreOptions,
    ) -> Result<DynamicImage, ModelError> {
        let mut image = image;

        if options.restore_face {
            let model = self.get_or_load(ModelKind::FaceRestore).await?;
            image = Self::apply_blocking(model, image).await?;
        }

        if options.colorize {
            let model = self.get_or_load(ModelKind::Colorize).await?;
            image = Self::apply_blocking(model, image).await?;
        }

        Ok(image)
    }

    /// Eagerly load both models, typically at startup.
    ///
    /// Returns the first load error encountered; the failed slot stays
    /// `Failed` and is retried on the next request.
    pub async fn warm_up(&self) -> Result<(), ModelError> {
        self.get_or_load(ModelKind::FaceRestore).await?;
        self.get_or_load(ModelKind::Colorize).await?;
        Ok(())
    }

    /// Whether both models are loaded and ready.
    pub async fn models_loaded(&self) -> bool {
        self.face.is_ready().await && self.colorizer.is_ready().await
    }

    /// Get a model, loading it if necessary.
    ///
    /// Exactly one caller performs the load; others wait and share the
    /// outcome. A slot observed as `Failed` is re-attempted by the observer.
    async fn get_or_load(
        &self,
        kind: ModelKind,
    ) -> Result<Arc<dyn RestorationModel>, ModelError> {
        let slot = match kind {
            ModelKind::FaceRestore => &self.face,
            ModelKind::Colorize => &self.colorizer,
        };

        loop {
            // Register for notification before inspecting state so a
            // notify_waiters between the two cannot be lost.
            let notified = slot.notify.notified();

            {
                let mut state = slot.state.lock().await;
                match &*state {
                    LoadState::Ready(model) => return Ok(model.clone()),
                    LoadState::Loading => {}
                    LoadState::Unloaded => {
                        *state = LoadState::Loading;
                        drop(state);
                        return self.load_slot(slot, kind).await;
                    }
                    LoadState::Failed(reason) => {
                        debug!(model = kind.name(), reason = %reason, "retrying failed model load");
                        *state = LoadState::Loading;
                        drop(state);
                        return self.load_slot(slot, kind).await;
                    }
                }
            }

            // Another task is loading; wait for it and re-check.
            notified.await;
        }
    }

    /// Perform the load as the leader for this slot.
    async fn load_slot(
        &self,
        slot: &ModelSlot,
        kind: ModelKind,
    ) -> Result<Arc<dyn RestorationModel>, ModelError> {
        info!(model = kind.name(), "loading model");

        let result = match kind {
            ModelKind::FaceRestore => self.provider.load_face_restorer().await,
            ModelKind::Colorize => self.provider.load_colorizer().await,
        };

        {
            let mut state = slot.state.lock().await;
            *state = match &result {
                Ok(model) => {
                    info!(model = kind.name(), "model ready");
                    LoadState::Ready(model.clone())
                }
                Err(e) => {
                    warn!(model = kind.name(), error = %e, "model load failed");
                    LoadState::Failed(e.to_string())
                }
            };
        }
        slot.notify.notify_waiters();

        result
    }

    /// Run one model on the blocking thread pool.
    async fn apply_blocking(
        model: Arc<dyn RestorationModel>,
        image: DynamicImage,
    ) -> Result<DynamicImage, ModelError> {
        let name = model.name();
        tokio::task::spawn_blocking(move || model.apply(&image))
            .await
            .map_err(|e| ModelError::Inference {
                model: name,
                reason: format!("inference worker failed: {}", e),
            })?
    }
}

// =============================================================================
// Tests
// =============================================================================
