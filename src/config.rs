//! Configuration management for the photo restoration service.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `RESTORE_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use photo_restorer::config::Config;
//!
//! // Parse from command line and environment
//! let config = Config::parse();
//!
//! println!("Listening on {}:{}", config.host, config.port);
//! println!("Output directory: {}", config.output_dir);
//! ```
//!
//! # Environment Variables
//!
//! All configuration options can be set via environment variables with the
//! `RESTORE_` prefix:
//!
//! - `RESTORE_HOST` - Server bind address (default: 0.0.0.0)
//! - `RESTORE_PORT` - Server port (default: 7860)
//! - `RESTORE_OUTPUT_DIR` - Artifact output directory (default: ./outputs)
//! - `RESTORE_CACHE_TTL` - Result cache TTL in seconds (default: 86400)
//! - `RESTORE_CACHE_CAPACITY` - Max cached results (default: 256)
//! - `RESTORE_PREVIEW_MAX_DIM` - Preview tier size cap (default: 600)
//! - `RESTORE_HD_MAX_DIM` - HD tier size cap (default: 1200)
//! - `RESTORE_MAX_INPUT_DIM` - Input normalization cap (default: 2048)
//! - `RESTORE_MAX_UPLOAD_BYTES` - Upload size limit (default: 10485760)
//! - `RESTORE_PAYMENT_URL` - Payment provider URL (optional)
//! - `RESTORE_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)

use clap::Parser;

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use crate::codec::DEFAULT_MAX_INPUT_DIM;
use crate::server::DEFAULT_MAX_UPLOAD_BYTES;
use crate::tier::{DEFAULT_HD_MAX_DIM, DEFAULT_PREVIEW_MAX_DIM};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 7860;

/// Default artifact output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "./outputs";

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Default interval between background cache sweeps in seconds (10 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Photo Restorer - a restoration service for old photographs.
///
/// Accepts photo uploads over HTTP, runs face restoration and colorization
/// models over them, and serves watermarked previews or clean HD results
/// behind a payment confirmation flag.
#[derive(Parser, Debug, Clone)]
#[command(name = "photo-restorer")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "RESTORE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "RESTORE_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory where restored artifacts are written.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "RESTORE_OUTPUT_DIR")]
    pub output_dir: String,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Result cache time-to-live in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL.as_secs(), env = "RESTORE_CACHE_TTL")]
    pub cache_ttl_secs: u64,

    /// Maximum number of restored results to keep in memory.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY, env = "RESTORE_CACHE_CAPACITY")]
    pub cache_capacity: usize,

    /// Seconds between background sweeps of expired cache entries.
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL_SECS, env = "RESTORE_SWEEP_INTERVAL")]
    pub sweep_interval_secs: u64,

    /// HTTP Cache-Control max-age in seconds for artifact responses.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "RESTORE_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // Image Configuration
    // =========================================================================
    /// Maximum dimension of the preview tier in pixels.
    #[arg(long, default_value_t = DEFAULT_PREVIEW_MAX_DIM, env = "RESTORE_PREVIEW_MAX_DIM")]
    pub preview_max_dim: u32,

    /// Maximum dimension of the HD tier in pixels.
    #[arg(long, default_value_t = DEFAULT_HD_MAX_DIM, env = "RESTORE_HD_MAX_DIM")]
    pub hd_max_dim: u32,

    /// Maximum dimension inputs are normalized to before inference.
    #[arg(long, default_value_t = DEFAULT_MAX_INPUT_DIM, env = "RESTORE_MAX_INPUT_DIM")]
    pub max_input_dim: u32,

    /// Maximum accepted upload size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "RESTORE_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // =========================================================================
    // Payment Configuration
    // =========================================================================
    /// Payment provider URL surfaced in restore responses.
    ///
    /// The service never talks to the provider; it only hands the URL to the
    /// client and trusts the `paid` flag on the request.
    #[arg(long, env = "RESTORE_PAYMENT_URL")]
    pub payment_url: Option<String>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "RESTORE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.output_dir.is_empty() {
            return Err(
                "Output directory is required. Set --output-dir or RESTORE_OUTPUT_DIR".to_string(),
            );
        }

        if self.cache_ttl_secs == 0 {
            return Err("cache_ttl_secs must be greater than 0".to_string());
        }
        if self.cache_capacity == 0 {
            return Err("cache_capacity must be greater than 0".to_string());
        }
        if self.sweep_interval_secs == 0 {
            return Err("sweep_interval_secs must be greater than 0".to_string());
        }

        if self.preview_max_dim == 0 || self.hd_max_dim == 0 || self.max_input_dim == 0 {
            return Err("image dimension limits must be greater than 0".to_string());
        }
        if self.preview_max_dim > self.hd_max_dim {
            return Err("preview_max_dim must not exceed hd_max_dim".to_string());
        }

        if self.max_upload_bytes < 1024 {
            return Err("max_upload_bytes must be at least 1KB".to_string());
        }

        // Reject a malformed payment URL at startup instead of handing a
        // broken link to every client
        if let Some(ref payment_url) = self.payment_url {
            url::Url::parse(payment_url)
                .map_err(|e| format!("payment_url is not a valid URL: {}", e))?;
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Tests
// =============================================================================
