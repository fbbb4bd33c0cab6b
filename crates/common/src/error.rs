//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::PayloadTooLarge`] → 413
/// - [`ServiceError::Internal`] → 500
///
/// Messages carried here are shown to callers as-is, so they must never say
/// whether a stored file is missing or failed authentication.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed: bad file name, missing multipart field.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The stored file is absent, or present but failed to decrypt.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body exceeded the configured upload limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::PayloadTooLarge(_) => 413,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::PayloadTooLarge(_) => "payload_too_large",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// The caller-facing message without the display prefix.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::BadRequest(m)
            | ServiceError::NotFound(m)
            | ServiceError::PayloadTooLarge(m)
            | ServiceError::Internal(m) => m,
        }
    }
}
