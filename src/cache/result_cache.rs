//! TTL cache for rendered restoration artifacts.
//!
//! Entries map a [`Fingerprint`] to both rendered tiers plus their creation
//! time. The cache is bounded two ways:
//!
//! - **TTL**: entries older than the time-to-live are treated as absent on
//!   lookup and removed by [`ResultCache::evict_expired`].
//! - **Capacity**: an LRU bound on the entry count keeps memory use flat on a
//!   small instance even if the sweep falls behind.
//!
//! # Thread Safety
//!
//! The entry map is behind an async `RwLock`; lookups clone the entry out
//! under the lock, so eviction can never free an entry another request is
//! still reading.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::debug;

use super::clock::Clock;
use super::fingerprint::Fingerprint;

/// Default time-to-live for cached results: 24 hours.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 3600);

/// Default maximum number of cached results.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

// =============================================================================
// Cache Entry
// =============================================================================

/// Both rendered tiers for one fingerprint.
///
/// Created only after the full pipeline succeeds; a partially rendered result
/// is never inserted.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Encoded preview artifact (watermarked PNG)
    pub preview: Bytes,

    /// Encoded HD artifact (unmarked PNG)
    pub hd: Bytes,

    /// Whether both artifact files reached the artifact store; hits for an
    /// unpersisted entry must not advertise a download URL
    pub persisted: bool,

    /// Insertion time, measured by the cache's clock
    pub created_at: SystemTime,
}

// =============================================================================
// Result Cache
// =============================================================================

/// In-memory cache of completed restorations with TTL and LRU bounds.
pub struct ResultCache {
    entries: RwLock<LruCache<Fingerprint, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    /// Create a cache with the given TTL, entry capacity and clock.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (rejected earlier by config validation).
    pub fn new(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("cache capacity must be non-zero"),
            )),
            ttl,
            clock,
        }
    }

    /// Look up a cached result.
    ///
    /// Returns `None` for absent and for expired entries; an expired entry is
    /// removed on the spot rather than waiting for the next sweep.
    pub async fn lookup(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        match entries.get(fingerprint) {
            Some(entry) if self.is_expired(entry, now) => {
                entries.pop(fingerprint);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    /// Store a rendered result.
    ///
    /// Idempotent for a given fingerprint: storing the same artifacts again
    /// overwrites in place and refreshes the creation time. `persisted`
    /// records whether the artifact files made it to the store.
    pub async fn store(&self, fingerprint: Fingerprint, preview: Bytes, hd: Bytes, persisted: bool) {
        let entry = CacheEntry {
            preview,
            hd,
            persisted,
            created_at: self.clock.now(),
        };
        let mut entries = self.entries.write().await;
        entries.put(fingerprint, entry);
    }

    /// Remove every entry older than the TTL.
    ///
    /// Returns the evicted fingerprints so the caller can drop the matching
    /// persisted artifacts.
    pub async fn evict_expired(&self) -> Vec<Fingerprint> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        let expired: Vec<Fingerprint> = entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(fp, _)| fp.clone())
            .collect();

        for fp in &expired {
            entries.pop(fp);
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "evicted expired cache entries");
        }

        expired
    }

    /// Number of entries currently held (including not-yet-swept expired ones).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop all entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, entry: &CacheEntry, now: SystemTime) -> bool {
        now.duration_since(entry.created_at)
            .map(|age| age > self.ttl)
            .unwrap_or(false)
    }
}

// =============================================================================
// Tests
// =============================================================================
