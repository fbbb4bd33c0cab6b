//! Request and response types exchanged with API clients.
//!
//! These types are serialised as JSON by the vault's HTTP API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// File endpoints
// ---------------------------------------------------------------------------

/// Response body for `GET /files`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileListResponse {
    /// Names of the stored files, sorted, without the container suffix.
    pub files: Vec<String>,
}

/// Response body for `PUT /files/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Name the file was stored under.
    pub name: String,
    /// Size in bytes of the container written to disk.
    pub stored_bytes: u64,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"not_found"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.message())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Non-secret fingerprint of the loaded encryption key.
    pub key_id: String,
    /// Number of encrypted files currently stored.
    pub stored_files: usize,
}
