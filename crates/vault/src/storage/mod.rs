//! On-disk storage of encrypted containers.
//!
//! # Layout
//!
//! Every stored file lives directly under the upload directory as
//! `<name>.enc`. Decrypted copies written for a download are named
//! `temp_<uuid>_<name>` and exist only for the lifetime of a [`ScratchFile`]
//! guard. Containers are first written as `.upload-<uuid>` and renamed into
//! place, so a crash never leaves a half-written `.enc` file behind.
//!
//! # Invariants
//!
//! - Plaintext is never persisted under a stored name; at most it exists as a
//!   scratch file that is deleted when its guard drops.
//! - A single writer per name is assumed. Concurrent uploads of the same name
//!   race and the last rename wins.

pub mod scratch;
pub mod store;

pub use scratch::ScratchFile;
pub use store::Storage;

use thiserror::Error;

use crate::crypto::ContainerError;

/// Suffix reserved for encrypted containers.
pub const CONTAINER_SUFFIX: &str = ".enc";

/// Prefix of decrypted scratch copies.
pub const SCRATCH_PREFIX: &str = "temp_";

/// Prefix of containers that are still being written.
pub const PENDING_PREFIX: &str = ".upload-";

/// Longest single path component the filesystem accepts.
const FS_NAME_MAX: usize = 255;

/// Longest accepted file name. The scratch name `temp_<uuid>_<name>` is the
/// longest name derived from it and must still fit in [`FS_NAME_MAX`].
pub const MAX_NAME_LEN: usize =
    FS_NAME_MAX - SCRATCH_PREFIX.len() - uuid::fmt::Simple::LENGTH - 1;

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file name is empty, too long, or could escape the upload directory.
    #[error("invalid file name")]
    InvalidName,

    /// No container is stored under the requested name.
    #[error("stored file not found")]
    NotFound,

    /// The container could not be sealed or opened.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A filesystem operation failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Check that `name` is usable as a single path component in the upload
/// directory and does not collide with reserved names.
///
/// # Errors
///
/// Returns [`StorageError::InvalidName`] on the first violated rule.
pub fn validate_name(name: &str) -> Result<(), StorageError> {
    let reserved = name.starts_with(SCRATCH_PREFIX)
        || name.starts_with(PENDING_PREFIX)
        || name.ends_with(CONTAINER_SUFFIX);
    if name.is_empty()
        || name.len() > MAX_NAME_LEN
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || reserved
    {
        return Err(StorageError::InvalidName);
    }
    Ok(())
}
