//! Deterministic fingerprint over (image bytes, option flags).
//!
//! The fingerprint is the cache key: two requests with identical bytes and
//! identical options must always collide, and any difference in either must
//! always separate them. The digest covers the raw upload bytes, not decoded
//! pixels, so fingerprinting stays cheap on the request path.

use sha2::{Digest, Sha256};

use crate::model::RestoreOptions;

/// Hex-encoded SHA-256 digest identifying an (input, options) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of an upload.
    ///
    /// Pure: the same `(data, options)` always yields the same fingerprint.
    pub fn compute(data: &[u8], options: &RestoreOptions) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.update([options.restore_face as u8, options.colorize as u8]);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
