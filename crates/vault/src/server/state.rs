//! Shared application state injected into every Axum handler.

use crate::storage::Storage;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-backed) so that Axum can clone the
/// state for each request without copying expensive data.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Encrypted file storage, including the codec and its key.
    pub storage: Storage,
}

impl AppState {
    /// Create a new [`AppState`] over `storage`.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}
