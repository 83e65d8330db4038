//! Content-addressed result cache.
//!
//! Completed restorations are cached by a deterministic fingerprint of the
//! input bytes and option flags, so re-uploading the same photo within the
//! TTL is served without a second model invocation.
//!
//! # Components
//!
//! - [`Fingerprint`]: SHA-256 digest identifying an (input, options) pair
//! - [`ResultCache`]: in-memory TTL cache of rendered artifacts, bounded by
//!   entry count with LRU eviction, clocked through an injectable [`Clock`]
//! - [`ArtifactStore`]: pluggable persistence for artifact files
//!   ([`FsStore`] for the output directory, [`MemoryStore`] for tests)

mod clock;
mod fingerprint;
mod result_cache;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fingerprint::Fingerprint;
pub use result_cache::{CacheEntry, ResultCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
pub use store::{artifact_file_name, ArtifactStore, FsStore, MemoryStore};
