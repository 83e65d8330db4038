//! Restore service: upload → fingerprint → cache → inference → artifacts.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::cache::{artifact_file_name, ArtifactStore, CacheEntry, Fingerprint, ResultCache};
use crate::codec;
use crate::error::RestoreError;
use crate::model::{ModelGateway, RestoreOptions};
use crate::tier::{Tier, TieringStage};

// =============================================================================
// Request / Outcome
// =============================================================================

/// One upload plus its processing options.
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    /// Raw uploaded image bytes
    pub data: Bytes,

    /// Which restoration steps to run
    pub options: RestoreOptions,

    /// Caller-supplied payment confirmation; selects the HD tier
    pub paid: bool,
}

/// Result of a restore request.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    /// The encoded artifact for the selected tier
    pub artifact: Bytes,

    /// Which tier was served
    pub tier: Tier,

    /// Cache key of this result
    pub fingerprint: Fingerprint,

    /// Whether the result came from the cache
    pub cache_hit: bool,

    /// URL path of the persisted artifact, absent if persistence failed
    pub artifact_url: Option<String>,
}

/// Pipeline result shared between single-flight waiters.
#[derive(Clone)]
struct PipelineOutput {
    preview: Bytes,
    hd: Bytes,
    persisted: bool,
}

/// Single-flight slot for one in-flight fingerprint.
struct InFlightState {
    notify: Notify,
    result: Mutex<Option<Result<PipelineOutput, RestoreError>>>,
}

// =============================================================================
// Restore Service
// =============================================================================

/// Orchestrates the restoration pipeline.
///
/// Per request the service walks
/// `Received → FingerprintComputed → CacheHit | CacheMiss → Inferring →
/// Tiered → Stored → Responded`; any stage error terminates in `Failed`
/// and surfaces as a [`RestoreError`].
pub struct RestoreService {
    gateway: Arc<ModelGateway>,
    cache: Arc<ResultCache>,
    store: Arc<dyn ArtifactStore>,
    tiering: TieringStage,
    max_input_dim: u32,
    in_flight: Arc<Mutex<HashMap<Fingerprint, Arc<InFlightState>>>>,
}

impl RestoreService {
    /// Create a service over the given collaborators.
    pub fn new(
        gateway: Arc<ModelGateway>,
        cache: Arc<ResultCache>,
        store: Arc<dyn ArtifactStore>,
        tiering: TieringStage,
        max_input_dim: u32,
    ) -> Self {
        Self {
            gateway,
            cache,
            store,
            tiering,
            max_input_dim,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Process one upload end to end.
    ///
    /// On a cache hit the stored artifacts are served directly. On a miss the
    /// pipeline runs in a detached task: a client disconnect mid-inference
    /// lets the computation finish and populate the cache for later reuse,
    /// and a partial result is never stored.
    pub async fn restore(&self, request: RestoreRequest) -> Result<RestoreOutcome, RestoreError> {
        // Request-time sweep, mirroring the per-request cache cleaning of the
        // original service; a background tick also runs in the binary.
        self.sweep_expired().await;

        let fingerprint = Fingerprint::compute(&request.data, &request.options);
        debug!(fingerprint = %fingerprint, options = ?request.options, "restore request");

        if let Some(entry) = self.cache.lookup(&fingerprint).await {
            debug!(fingerprint = %fingerprint, "cache hit");
            return Ok(self.outcome_from_entry(&fingerprint, &entry, request.paid, true));
        }

        let output = self.run_single_flight(&fingerprint, &request).await?;

        let tier = Self::select_tier(request.paid);
        let artifact = match tier {
            Tier::Preview => output.preview.clone(),
            Tier::Hd => output.hd.clone(),
        };

        Ok(RestoreOutcome {
            artifact,
            tier,
            artifact_url: output
                .persisted
                .then(|| format!("/outputs/{}", artifact_file_name(&fingerprint, tier))),
            fingerprint: fingerprint.clone(),
            cache_hit: false,
        })
    }

    /// Evict expired cache entries and delete their persisted artifacts.
    ///
    /// Returns the number of entries removed.
    pub async fn sweep_expired(&self) -> usize {
        let expired = self.cache.evict_expired().await;
        for fingerprint in &expired {
            for tier in [Tier::Preview, Tier::Hd] {
                let name = artifact_file_name(fingerprint, tier);
                if let Err(e) = self.store.remove(&name).await {
                    warn!(artifact = %name, error = %e, "failed to remove expired artifact");
                }
            }
        }
        expired.len()
    }

    /// Number of results currently cached.
    pub async fn cache_len(&self) -> usize {
        self.cache.len().await
    }

    /// Whether both models are loaded (exposed for the health endpoint).
    pub async fn models_loaded(&self) -> bool {
        self.gateway.models_loaded().await
    }

    /// Eagerly load the models at startup.
    pub async fn warm_up(&self) -> Result<(), crate::error::ModelError> {
        self.gateway.warm_up().await
    }

    /// Read a persisted artifact by file name (for the /outputs route).
    pub async fn persisted_artifact(
        &self,
        name: &str,
    ) -> Result<Option<Bytes>, crate::error::CacheError> {
        self.store.get(name).await
    }

    fn select_tier(paid: bool) -> Tier {
        if paid {
            Tier::Hd
        } else {
            Tier::Preview
        }
    }

    fn outcome_from_entry(
        &self,
        fingerprint: &Fingerprint,
        entry: &CacheEntry,
        paid: bool,
        cache_hit: bool,
    ) -> RestoreOutcome {
        let tier = Self::select_tier(paid);
        let artifact = match tier {
            Tier::Preview => entry.preview.clone(),
            Tier::Hd => entry.hd.clone(),
        };
        RestoreOutcome {
            artifact,
            tier,
            fingerprint: fingerprint.clone(),
            cache_hit,
            // An entry computed under a failing store has no files on disk;
            // advertising a URL for it would 404.
            artifact_url: entry
                .persisted
                .then(|| format!("/outputs/{}", artifact_file_name(fingerprint, tier))),
        }
    }

    /// Coalesce concurrent misses for the same fingerprint into one pipeline
    /// run.
    ///
    /// The first caller becomes the leader and spawns the pipeline as a
    /// detached task; everyone (leader included) waits on the slot and clones
    /// the shared result.
    async fn run_single_flight(
        &self,
        fingerprint: &Fingerprint,
        request: &RestoreRequest,
    ) -> Result<PipelineOutput, RestoreError> {
        let state = {
            let mut in_flight = self.in_flight.lock().await;

            if let Some(state) = in_flight.get(fingerprint) {
                debug!(fingerprint = %fingerprint, "joining in-flight restoration");
                state.clone()
            } else {
                // A previous leader may have finished between our cache miss
                // and taking this lock; re-check before starting a new run.
                if let Some(entry) = self.cache.lookup(fingerprint).await {
                    debug!(fingerprint = %fingerprint, "cache filled before pipeline start");
                    return Ok(PipelineOutput {
                        preview: entry.preview,
                        hd: entry.hd,
                        persisted: entry.persisted,
                    });
                }

                let state = Arc::new(InFlightState {
                    notify: Notify::new(),
                    result: Mutex::new(None),
                });
                in_flight.insert(fingerprint.clone(), state.clone());
                drop(in_flight);

                self.spawn_pipeline(fingerprint.clone(), request.clone(), state.clone());
                state
            }
        };

        loop {
            // Register before checking the slot so a notify_waiters between
            // the check and the await cannot be lost.
            let notified = state.notify.notified();

            {
                let result = state.result.lock().await;
                if let Some(ref result) = *result {
                    return result.clone();
                }
            }

            notified.await;
        }
    }

    /// Run decode → inference → tiering → store as a detached task.
    fn spawn_pipeline(
        &self,
        fingerprint: Fingerprint,
        request: RestoreRequest,
        state: Arc<InFlightState>,
    ) {
        let gateway = self.gateway.clone();
        let cache = self.cache.clone();
        let store = self.store.clone();
        let tiering = self.tiering.clone();
        let max_input_dim = self.max_input_dim;
        let in_flight = self.in_flight.clone();

        tokio::spawn(async move {
            let result = Self::run_pipeline(
                gateway,
                cache,
                store,
                tiering,
                max_input_dim,
                &fingerprint,
                request,
            )
            .await;

            if let Err(ref e) = result {
                info!(fingerprint = %fingerprint, error = %e, "restoration failed");
            }

            {
                let mut slot = state.result.lock().await;
                *slot = Some(result);
            }
            {
                let mut in_flight = in_flight.lock().await;
                in_flight.remove(&fingerprint);
            }
            state.notify.notify_waiters();
        });
    }

    async fn run_pipeline(
        gateway: Arc<ModelGateway>,
        cache: Arc<ResultCache>,
        store: Arc<dyn ArtifactStore>,
        tiering: TieringStage,
        max_input_dim: u32,
        fingerprint: &Fingerprint,
        request: RestoreRequest,
    ) -> Result<PipelineOutput, RestoreError> {
        // Decode and normalize off the async runtime; image decoding of a
        // large upload is CPU work too.
        let data = request.data.clone();
        let image = tokio::task::spawn_blocking(move || {
            codec::decode(&data).map(|img| codec::normalize(img, max_input_dim))
        })
        .await
        .map_err(|e| RestoreError::Internal(format!("decode worker failed: {}", e)))??;

        let restored = gateway.infer(image, request.options).await?;

        // Tiering and PNG encoding are also CPU-bound.
        let (preview, hd) = tokio::task::spawn_blocking(move || {
            let tiered = tiering.tier(&restored);
            let preview = codec::encode_png(&tiered.preview)?;
            let hd = codec::encode_png(&tiered.hd)?;
            Ok::<_, RestoreError>((preview, hd))
        })
        .await
        .map_err(|e| RestoreError::Internal(format!("tiering worker failed: {}", e)))??;

        // Persistence failures degrade gracefully: the caller still gets the
        // computed artifact, only the download URL is dropped.
        let mut persisted = true;
        for (tier, data) in [(Tier::Preview, &preview), (Tier::Hd, &hd)] {
            let name = artifact_file_name(fingerprint, tier);
            if let Err(e) = store.put(&name, data.clone()).await {
                warn!(artifact = %name, error = %e, "artifact persistence failed, continuing");
                persisted = false;
            }
        }

        // The entry records whether the files made it to the store so later
        // hits know whether a download URL exists.
        cache
            .store(fingerprint.clone(), preview.clone(), hd.clone(), persisted)
            .await;

        Ok(PipelineOutput {
            preview,
            hd,
            persisted,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
