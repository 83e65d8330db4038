//! Pluggable persistence for rendered artifacts.
//!
//! Artifacts are persisted as flat files named by fingerprint and tier so
//! `restored_url` keeps working for the lifetime of the cache entry. The
//! store is a trait so tests can swap the filesystem for memory.
//!
//! Store failures are non-fatal by contract: callers log and keep serving
//! the in-memory artifact.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::CacheError;
use crate::tier::Tier;

use super::fingerprint::Fingerprint;

/// File name for one persisted artifact, e.g. `result_<hex>_preview.png`.
pub fn artifact_file_name(fingerprint: &Fingerprint, tier: Tier) -> String {
    format!("result_{}_{}.png", fingerprint.as_str(), tier.suffix())
}

/// Reject names that could escape the store's root.
///
/// Artifact names are always generated from hex digests, so anything with
/// path separators or traversal components is hostile input.
fn validate_name(name: &str) -> Result<(), CacheError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(CacheError::InvalidName(name.to_string()));
    }
    Ok(())
}

// =============================================================================
// ArtifactStore Trait
// =============================================================================

/// Key-value persistence for encoded artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write an artifact, overwriting any previous content under `name`.
    async fn put(&self, name: &str, data: Bytes) -> Result<(), CacheError>;

    /// Read an artifact. `Ok(None)` means not present.
    async fn get(&self, name: &str) -> Result<Option<Bytes>, CacheError>;

    /// Delete an artifact. Deleting a missing artifact is not an error.
    async fn remove(&self, name: &str) -> Result<(), CacheError>;
}

// =============================================================================
// Filesystem Store
// =============================================================================

/// Artifact store backed by a flat output directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, CacheError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| CacheError::Io {
            name: root.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { root })
    }

    /// The directory artifacts are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, CacheError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl ArtifactStore for FsStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<(), CacheError> {
        let path = self.path_for(name)?;
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| CacheError::Io {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get(&self, name: &str) -> Result<Option<Bytes>, CacheError> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Io {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn remove(&self, name: &str) -> Result<(), CacheError> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Artifact store backed by a map, for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<(), CacheError> {
        validate_name(name)?;
        self.entries.write().await.insert(name.to_string(), data);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Bytes>, CacheError> {
        validate_name(name)?;
        Ok(self.entries.read().await.get(name).cloned())
    }

    async fn remove(&self, name: &str) -> Result<(), CacheError> {
        validate_name(name)?;
        self.entries.write().await.remove(name);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
