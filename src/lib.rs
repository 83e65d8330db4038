//! # Photo Restorer
//!
//! A web service for restoring old photographs.
//!
//! This library provides the core functionality for accepting photo uploads,
//! running CPU-bound restoration models (face restoration, colorization) over
//! them, and serving the results as a watermarked preview or a clean HD
//! artifact behind a payment confirmation flag.
//!
//! ## Features
//!
//! - **Lazy model loading**: Models are loaded on first use (or eagerly at
//!   startup) and reused for the process lifetime; failed loads are retried
//! - **Content-addressed caching**: Identical upload + options pairs are
//!   served from a 24-hour TTL cache without re-running inference
//! - **Request coalescing**: Concurrent identical requests share one pipeline
//!   run
//! - **Tiered output**: A free downscaled watermarked preview and a
//!   payment-gated clean HD artifact from every restoration
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`codec`] - Image decoding, normalization and PNG encoding
//! - [`model`] - Model gateway with lazy loading and built-in models
//! - [`tier`] - Watermark and tiering stage
//! - [`cache`] - Result cache, fingerprinting and artifact persistence
//! - [`pipeline`] - Request orchestration
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use photo_restorer::{
//!     cache::{FsStore, ResultCache, SystemClock, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL},
//!     codec::DEFAULT_MAX_INPUT_DIM,
//!     model::{BuiltinModelProvider, ModelGateway},
//!     pipeline::RestoreService,
//!     server::{create_router, RouterConfig},
//!     tier::TieringStage,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Arc::new(ModelGateway::new(Arc::new(BuiltinModelProvider::new())));
//!     let cache = Arc::new(ResultCache::new(
//!         DEFAULT_CACHE_TTL,
//!         DEFAULT_CACHE_CAPACITY,
//!         Arc::new(SystemClock),
//!     ));
//!     let store = Arc::new(FsStore::new("./outputs")?);
//!     let service = Arc::new(RestoreService::new(
//!         gateway,
//!         cache,
//!         store,
//!         TieringStage::default(),
//!         DEFAULT_MAX_INPUT_DIM,
//!     ));
//!
//!     let router = create_router(service, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:7860").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod tier;

// Re-export commonly used types
pub use cache::{
    artifact_file_name, ArtifactStore, CacheEntry, Clock, Fingerprint, FsStore, ManualClock,
    MemoryStore, ResultCache, SystemClock, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL,
};
pub use codec::DEFAULT_MAX_INPUT_DIM;
pub use config::Config;
pub use error::{CacheError, ModelError, RestoreError, ValidationError};
pub use model::{
    BuiltinModelProvider, LumaColorizer, ModelGateway, ModelProvider, RestorationModel,
    RestoreOptions, SharpenRestorer,
};
pub use pipeline::{RestoreOutcome, RestoreRequest, RestoreService};
pub use server::{
    create_router, ApiError, AppState, ErrorResponse, HealthResponse, RestoreResponse,
    RouterConfig, DEFAULT_MAX_UPLOAD_BYTES,
};
pub use tier::{Tier, TieredImages, TieringStage, DEFAULT_HD_MAX_DIM, DEFAULT_PREVIEW_MAX_DIM};
