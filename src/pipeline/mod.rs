//! Request orchestration layer.
//!
//! The [`RestoreService`] drives each upload through the full pipeline:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        RestoreService                            │
//! │  ┌──────────────────────────────────────────────────────────┐    │
//! │  │                      restore()                           │    │
//! │  │  1. Sweep expired      4. Decode + normalize             │    │
//! │  │  2. Fingerprint        5. Model gateway inference        │    │
//! │  │  3. Cache lookup       6. Tier, cache, persist, respond  │    │
//! │  └──────────────────────────────────────────────────────────┘    │
//! │          │                   │                    │              │
//! │          ▼                   ▼                    ▼              │
//! │   ┌─────────────┐    ┌──────────────┐    ┌────────────────┐      │
//! │   │ ResultCache │    │ ModelGateway │    │ TieringStage + │      │
//! │   │             │    │              │    │ ArtifactStore  │      │
//! │   └─────────────┘    └──────────────┘    └────────────────┘      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concurrent requests for the same fingerprint are coalesced: exactly one
//! pipeline run happens per unique (bytes, options) pair, and every waiter
//! shares its result.

mod service;

pub use service::{RestoreOutcome, RestoreRequest, RestoreService};
