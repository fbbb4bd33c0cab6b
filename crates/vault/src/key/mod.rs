//! Encryption key loading.
//!
//! # Lifecycle
//!
//! 1. At startup, [`load`] reads the key from `ENCRYPTION_KEY` (base64) or from
//!    the file named by `ENCRYPTION_KEY_FILE` (raw bytes).
//! 2. The decoded key lives only in process memory inside a [`SecretKey`] and is
//!    handed to the container codec, which owns it for the process lifetime.
//! 3. There is no rotation: a new key requires a restart, and containers sealed
//!    under the old key stop opening.
//!
//! # Security invariants
//!
//! - The key is **never** written to disk by this service, logged, or included
//!   in traces. Only [`SecretKey::fingerprint`] may be logged.
//! - Any problem with the key material is a [`KeyError`] that aborts startup.

pub mod secret;

pub use secret::SecretKey;

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::config::Config;
use crate::crypto::KEY_LEN;

/// Errors produced while loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Neither key source is configured.
    #[error("no encryption key configured")]
    Missing,

    /// Both key sources are configured.
    #[error("ENCRYPTION_KEY and ENCRYPTION_KEY_FILE are both set")]
    Ambiguous,

    /// `ENCRYPTION_KEY` is not valid standard base64.
    #[error("ENCRYPTION_KEY is not valid base64")]
    InvalidBase64,

    /// The key file could not be read.
    #[error("failed to read key file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The decoded key material has an unexpected length.
    #[error("encryption key has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Load the encryption key from whichever source `cfg` names.
///
/// # Errors
///
/// Returns a [`KeyError`] if no source or both sources are set, if decoding or
/// reading fails, or if the material is not exactly [`KEY_LEN`] bytes.
pub fn load(cfg: &Config) -> Result<SecretKey, KeyError> {
    match (&cfg.encryption_key, &cfg.encryption_key_file) {
        (Some(encoded), None) => from_base64(encoded),
        (None, Some(path)) => from_file(path),
        (None, None) => Err(KeyError::Missing),
        (Some(_), Some(_)) => Err(KeyError::Ambiguous),
    }
}

fn from_base64(encoded: &str) -> Result<SecretKey, KeyError> {
    let mut bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|_| KeyError::InvalidBase64)?;
    let key = SecretKey::from_slice(&bytes);
    bytes.iter_mut().for_each(|b| *b = 0);
    key
}

fn from_file(path: &Path) -> Result<SecretKey, KeyError> {
    let mut bytes = std::fs::read(path).map_err(|source| KeyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    // Tolerate the trailing newline most editors and `echo` append.
    if bytes.len() == KEY_LEN + 1 && bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    let key = SecretKey::from_slice(&bytes);
    bytes.iter_mut().for_each(|b| *b = 0);
    key
}
