//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, body size limits, and
//! response compression.

use std::time::Duration;

use crate::config::Config;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Request limits enforced by the router's middleware stack.
#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
    /// Time allowed to produce a response.
    pub request_timeout: Duration,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl From<&Config> for HttpLimits {
    fn from(cfg: &Config) -> Self {
        Self {
            max_upload_bytes: cfg.max_upload_bytes,
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
        }
    }
}
