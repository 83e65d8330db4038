//! HTTP request handlers for the photo restoration API.
//!
//! This module contains the Axum handlers for running restorations, serving
//! persisted artifacts and health checks.
//!
//! # Endpoints
//!
//! - `POST /restore` - Restore an uploaded photo
//! - `GET /outputs/{filename}` - Serve a persisted artifact
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{CacheError, ModelError, RestoreError, ValidationError};
use crate::model::RestoreOptions;
use crate::pipeline::{RestoreRequest, RestoreService};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the restore service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState {
    /// The service for processing restore requests
    pub service: Arc<RestoreService>,

    /// Cache control max-age in seconds for persisted artifacts
    pub cache_max_age: u32,

    /// Payment provider URL surfaced in restore responses, if configured
    pub payment_url: Option<String>,
}

impl AppState {
    /// Create a new application state with the given service.
    pub fn new(service: Arc<RestoreService>) -> Self {
        Self {
            service,
            cache_max_age: 3600, // 1 hour default
            payment_url: None,
        }
    }

    /// Set the Cache-Control max-age for artifact responses.
    pub fn with_cache_max_age(mut self, cache_max_age: u32) -> Self {
        self.cache_max_age = cache_max_age;
        self
    }

    /// Set the payment URL included in restore responses.
    pub fn with_payment_url(mut self, payment_url: Option<String>) -> Self {
        self.payment_url = payment_url;
        self
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache_max_age: self.cache_max_age,
            payment_url: self.payment_url.clone(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "unsupported_format", "model_unavailable")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Successful restore response.
#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    /// Always true for a 200 response
    pub success: bool,

    /// The restored artifact as base64-encoded PNG
    pub restored_image: String,

    /// URL path of the persisted artifact (absent if persistence failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restored_url: Option<String>,

    /// Human-readable status message
    pub message: String,

    /// Whether the result was served from the cache
    pub cache_hit: bool,

    /// Which tier was served ("preview" or "hd")
    pub tier: String,

    /// Where to pay for the HD tier, if a payment provider is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Whether both restoration models are loaded
    pub models_loaded: bool,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Wrapper for handler errors to implement IntoResponse.
pub struct ApiError(pub RestoreError);

impl From<RestoreError> for ApiError {
    fn from(err: RestoreError) -> Self {
        ApiError(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError(RestoreError::Validation(err))
    }
}

/// Convert RestoreError to HTTP response.
///
/// This implementation logs errors appropriately based on their severity:
/// - 4xx errors are logged at WARN or DEBUG level (client errors)
/// - 5xx errors are logged at ERROR level (server errors)
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self.0 {
            // 400 Bad Request - invalid uploads
            RestoreError::Validation(ValidationError::EmptyUpload) => (
                StatusCode::BAD_REQUEST,
                "empty_upload",
                self.0.to_string(),
            ),
            RestoreError::Validation(ValidationError::Decode(_)) => (
                StatusCode::BAD_REQUEST,
                "decode_error",
                self.0.to_string(),
            ),

            // 415 Unsupported Media Type - not a recognized raster format
            RestoreError::Validation(ValidationError::UnsupportedFormat { .. }) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_format",
                self.0.to_string(),
            ),

            // 503 Service Unavailable - the model could not be loaded; the
            // next request re-attempts the load
            RestoreError::Model(ModelError::Load { .. }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "model_unavailable",
                self.0.to_string(),
            ),

            // 500 Internal Server Error - inference and processing errors
            RestoreError::Model(ModelError::Inference { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "inference_error",
                self.0.to_string(),
            ),

            RestoreError::Cache(CacheError::InvalidName(_)) => (
                StatusCode::BAD_REQUEST,
                "invalid_name",
                self.0.to_string(),
            ),

            RestoreError::Cache(CacheError::Io { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                self.0.to_string(),
            ),

            RestoreError::Encode(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "encode_error",
                self.0.to_string(),
            ),

            RestoreError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                self.0.to_string(),
            ),
        };

        // Log errors based on severity
        if status.is_server_error() || status == StatusCode::SERVICE_UNAVAILABLE {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Multipart Parsing
// =============================================================================

/// Fields extracted from the multipart restore request.
#[derive(Debug)]
struct RestoreForm {
    data: Bytes,
    options: RestoreOptions,
    paid: bool,
}

/// Parse a form boolean the way lenient HTML forms send them.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Pull the upload and option flags out of the multipart body.
///
/// Unknown fields are ignored. A missing or empty `file` field is rejected;
/// missing flags fall back to the defaults (both restoration steps on,
/// unpaid).
async fn parse_restore_form(mut multipart: Multipart) -> Result<RestoreForm, ApiError> {
    let mut data: Option<Bytes> = None;
    let defaults = RestoreOptions::default();
    let mut restore_face = defaults.restore_face;
    let mut colorize = defaults.colorize;
    let mut paid = false;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ValidationError::Decode(format!("malformed multipart body: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field.bytes().await.map_err(|e| {
                    ValidationError::Decode(format!("failed to read upload: {}", e))
                })?;
                data = Some(bytes);
            }
            "restore_face" => {
                let value = field.text().await.map_err(|e| {
                    ValidationError::Decode(format!("failed to read field: {}", e))
                })?;
                restore_face = parse_flag(&value);
            }
            "colorize" => {
                let value = field.text().await.map_err(|e| {
                    ValidationError::Decode(format!("failed to read field: {}", e))
                })?;
                colorize = parse_flag(&value);
            }
            "paid" => {
                let value = field.text().await.map_err(|e| {
                    ValidationError::Decode(format!("failed to read field: {}", e))
                })?;
                paid = parse_flag(&value);
            }
            other => {
                debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let data = match data {
        Some(data) if !data.is_empty() => data,
        _ => return Err(ValidationError::EmptyUpload.into()),
    };

    Ok(RestoreForm {
        data,
        options: RestoreOptions {
            restore_face,
            colorize,
        },
        paid,
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle restore requests.
///
/// # Endpoint
///
/// `POST /restore`
///
/// # Multipart Fields
///
/// - `file`: The image to restore (required)
/// - `restore_face`: Run face restoration (default: true)
/// - `colorize`: Run colorization (default: true)
/// - `paid`: Payment confirmation; selects the clean HD tier (default: false)
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "success": true,
///   "restored_image": "<base64 PNG>",
///   "restored_url": "/outputs/result_<fingerprint>_preview.png",
///   "message": "Photo restored successfully",
///   "cache_hit": false,
///   "tier": "preview",
///   "payment_url": "https://pay.example.com/checkout"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Empty upload or undecodable image data
/// - `415 Unsupported Media Type`: Not a recognized raster format
/// - `503 Service Unavailable`: A restoration model failed to load
/// - `500 Internal Server Error`: Inference or processing error
pub async fn restore_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RestoreResponse>, ApiError> {
    let form = parse_restore_form(multipart).await?;

    let outcome = state
        .service
        .restore(RestoreRequest {
            data: form.data,
            options: form.options,
            paid: form.paid,
        })
        .await?;

    let restored_image = base64::engine::general_purpose::STANDARD.encode(&outcome.artifact);

    let message = if outcome.cache_hit {
        "Photo restored successfully (cached)".to_string()
    } else {
        "Photo restored successfully".to_string()
    };

    Ok(Json(RestoreResponse {
        success: true,
        restored_image,
        restored_url: outcome.artifact_url,
        message,
        cache_hit: outcome.cache_hit,
        tier: outcome.tier.to_string(),
        payment_url: state.payment_url.clone(),
    }))
}

/// Handle persisted artifact requests.
///
/// # Endpoint
///
/// `GET /outputs/{filename}`
///
/// # Response
///
/// - `200 OK`: PNG artifact with `Content-Type: image/png`
/// - `404 Not Found`: No artifact with that name (including expired and
///   hostile names)
///
/// # Headers
///
/// - `Content-Type: image/png`
/// - `Cache-Control: public, max-age={cache_max_age}`
pub async fn artifact_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let data = match state.service.persisted_artifact(&filename).await {
        Ok(Some(data)) => data,
        // Sanitization failures look like 404s; they never hit the disk
        Ok(None) | Err(CacheError::InvalidName(_)) => {
            debug!(artifact = %filename, "artifact not found");
            let body = ErrorResponse::with_status(
                "not_found",
                format!("Artifact not found: {}", filename),
                StatusCode::NOT_FOUND,
            );
            return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
        }
        Err(e) => return Err(RestoreError::Cache(e).into()),
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        )
        .body(axum::body::Body::from(data))
        .map_err(|e| RestoreError::Internal(format!("response build failed: {}", e)))?;

    Ok(response)
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "models_loaded": true
/// }
/// ```
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        models_loaded: state.service.models_loaded().await,
    })
}

// =============================================================================
// Tests
// =============================================================================
