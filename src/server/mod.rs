//! HTTP server layer for the photo restoration service.
//!
//! This module provides the HTTP API over the restoration pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   POST /restore    GET /outputs/{filename}    GET /health       │
//! │                                                                 │
//! │        ┌─────────────────┐      ┌─────────────────────────┐     │
//! │        │    handlers     │      │         routes          │     │
//! │        │   (requests)    │      │    (router config)      │     │
//! │        └─────────────────┘      └─────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    artifact_handler, health_handler, restore_handler, ApiError, AppState, ErrorResponse,
    HealthResponse, RestoreResponse,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_BYTES};
