//! Configuration loading and validation for the vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated vault service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Directory holding encrypted containers and transient scratch files.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Base64-encoded 16-byte encryption key. Mutually exclusive with
    /// `encryption_key_file`; exactly one of the two is **required**.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Path to a file containing the raw 16-byte encryption key.
    #[serde(default)]
    pub encryption_key_file: Option<PathBuf>,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Optional OTLP/gRPC endpoint; span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}
fn default_listen_port() -> u16 {
    5000
}
fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.upload_dir.as_os_str().is_empty() {
            anyhow::bail!("UPLOAD_DIR must not be empty");
        }
        match (&self.encryption_key, &self.encryption_key_file) {
            (None, None) => {
                anyhow::bail!("one of ENCRYPTION_KEY or ENCRYPTION_KEY_FILE is required")
            }
            (Some(_), Some(_)) => {
                anyhow::bail!("ENCRYPTION_KEY and ENCRYPTION_KEY_FILE are mutually exclusive")
            }
            _ => {}
        }
        if self.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be > 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            if endpoint.trim().is_empty() {
                anyhow::bail!("OTEL_EXPORTER_OTLP_ENDPOINT must not be blank when set");
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("upload_dir", &self.upload_dir)
            .field("listen_port", &self.listen_port)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("encryption_key_file", &self.encryption_key_file)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_config(encryption_key: Option<String>) -> Config {
    Config {
        upload_dir: default_upload_dir(),
        listen_port: default_listen_port(),
        encryption_key,
        encryption_key_file: None,
        max_upload_bytes: default_max_upload_bytes(),
        request_timeout_secs: default_request_timeout(),
        otel_exporter_otlp_endpoint: None,
        log_level: default_log_level(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_upload_dir(), PathBuf::from("uploads"));
        assert_eq!(default_listen_port(), 5000);
        assert_eq!(default_max_upload_bytes(), 16_777_216);
        assert_eq!(default_request_timeout(), 30);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_accepts_inline_key() {
        let cfg = test_config(Some("MDEyMzQ1Njc4OWFiY2RlZg==".into()));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_key() {
        let cfg = test_config(None);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_both_key_sources() {
        let mut cfg = test_config(Some("MDEyMzQ1Njc4OWFiY2RlZg==".into()));
        cfg.encryption_key_file = Some("/run/secrets/vault.key".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut cfg = test_config(Some("MDEyMzQ1Njc4OWFiY2RlZg==".into()));
        cfg.max_upload_bytes = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = test_config(Some("MDEyMzQ1Njc4OWFiY2RlZg==".into()));
        cfg.request_timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_otlp_endpoint() {
        let mut cfg = test_config(Some("MDEyMzQ1Njc4OWFiY2RlZg==".into()));
        cfg.otel_exporter_otlp_endpoint = Some("  ".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = test_config(Some("MDEyMzQ1Njc4OWFiY2RlZg==".into()));
        let out = format!("{cfg:?}");
        assert!(out.contains("REDACTED"));
        assert!(!out.contains("MDEyMzQ1Njc4OWFiY2RlZg"));
    }
}
