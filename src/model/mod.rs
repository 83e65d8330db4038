//! Model gateway layer.
//!
//! This module wraps the two external inference models (face restoration and
//! colorization) behind a uniform interface:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             RestoreService              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ModelGateway                │
//! │  (lazy load, per-model state machine,   │
//! │   inference on the blocking pool)       │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  face restorer  │    │     colorizer       │
//! │ (Restoration-   │    │  (Restoration-      │
//! │  Model impl)    │    │   Model impl)       │
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`ModelGateway`]: entry point for inference; loads each model at most
//!   once while healthy, re-attempts failed loads on the next call
//! - [`RestorationModel`]: trait implemented by each model
//! - [`ModelProvider`]: factory seam that supplies model instances, making
//!   the external models swappable in tests
//! - [`RestoreOptions`]: which restoration steps to run
//! - [`builtin`]: CPU reference implementations used by the server binary

pub mod builtin;
mod gateway;

pub use builtin::{BuiltinModelProvider, LumaColorizer, SharpenRestorer};
pub use gateway::{ModelGateway, ModelProvider, RestorationModel, RestoreOptions};
