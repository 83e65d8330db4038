use thiserror::Error;

/// Errors raised while validating and decoding an uploaded image.
///
/// These are client errors: the request is rejected immediately and never
/// retried (should map to HTTP 400 or 415).
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// The upload contained no image data
    #[error("Empty upload: no image data received")]
    EmptyUpload,

    /// The byte stream is not a recognized raster format
    #[error("Unsupported image format: {reason}")]
    UnsupportedFormat { reason: String },

    /// The container was recognized but the pixel data could not be decoded
    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// Errors from the model gateway.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The model could not be loaded (should map to HTTP 503).
    ///
    /// Load failures are not cached as permanently broken: the next request
    /// re-attempts the load.
    #[error("Model '{model}' failed to load: {reason}")]
    Load {
        model: &'static str,
        reason: String,
    },

    /// Inference failed on this input (should map to HTTP 500).
    ///
    /// Not retried automatically: inference is expensive and the failure is
    /// usually input-dependent.
    #[error("Model '{model}' inference failed: {reason}")]
    Inference {
        model: &'static str,
        reason: String,
    },
}

/// Errors from the artifact store (disk writes under the output directory).
///
/// Store failures degrade gracefully: the computed artifact is still returned
/// to the caller, only persistence is skipped.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Filesystem I/O failure
    #[error("Cache I/O failure for '{name}': {reason}")]
    Io { name: String, reason: String },

    /// Artifact name failed sanitization (path separators, traversal)
    #[error("Invalid artifact name: {0}")]
    InvalidName(String),
}

/// Top-level error for the restore pipeline.
///
/// Every stage failure is mapped to one of these variants and surfaced to the
/// caller as a JSON error body; nothing is silently swallowed.
#[derive(Debug, Clone, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Artifact encoding failed (server-side PNG writer)
    #[error("Failed to encode artifact: {0}")]
    Encode(String),

    /// The background pipeline task was cancelled or panicked
    #[error("Internal error: {0}")]
    Internal(String),
}
