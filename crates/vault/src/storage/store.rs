//! [`Storage`]: seals files into the upload directory and opens them back.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    validate_name, ScratchFile, StorageError, CONTAINER_SUFFIX, PENDING_PREFIX, SCRATCH_PREFIX,
};
use crate::crypto::ContainerCodec;

/// Handle to the upload directory and the codec used for everything in it.
///
/// Cheap to clone; clones share the same codec.
#[derive(Clone, Debug)]
pub struct Storage {
    root: Arc<PathBuf>,
    codec: Arc<ContainerCodec>,
}

impl Storage {
    /// Create a handle over `root`. Call [`Storage::init`] before first use.
    pub fn new(root: impl Into<PathBuf>, codec: Arc<ContainerCodec>) -> Self {
        Self {
            root: Arc::new(root.into()),
            codec,
        }
    }

    /// The codec this storage seals and opens with.
    pub fn codec(&self) -> &ContainerCodec {
        &self.codec
    }

    /// Create the upload directory if it does not exist yet.
    pub async fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.root.as_path()).await?;
        Ok(())
    }

    /// Confirm the upload directory still exists and is a directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if it is missing or not a directory.
    pub async fn check(&self) -> Result<(), StorageError> {
        let meta = fs::metadata(self.root.as_path()).await?;
        if !meta.is_dir() {
            return Err(
                io::Error::other(format!("{} is not a directory", self.root.display())).into(),
            );
        }
        Ok(())
    }

    /// Seal `plaintext` and persist it as `name`, replacing any previous file.
    ///
    /// Returns the number of bytes written to disk.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidName`] for unusable names and
    /// [`StorageError::Io`] if the container cannot be written.
    pub async fn store(&self, name: &str, plaintext: &[u8]) -> Result<u64, StorageError> {
        validate_name(name)?;
        let container = self.codec.seal(plaintext)?;

        let pending = self.pending_path();
        if let Err(e) = fs::write(&pending, &container).await {
            discard(&pending).await;
            return Err(e.into());
        }
        self.commit(&pending, name).await?;

        let stored = container.len() as u64;
        info!(name, stored_bytes = stored, "file stored");
        Ok(stored)
    }

    /// Seal the plaintext file at `src` as `name`, then delete `src`.
    ///
    /// Returns the number of bytes written to disk.
    ///
    /// # Errors
    ///
    /// As [`Storage::store`]; `src` is left in place if sealing fails.
    pub async fn import(&self, name: &str, src: &Path) -> Result<u64, StorageError> {
        validate_name(name)?;

        let pending = self.pending_path();
        let stored = match encrypt_file(&self.codec, src, &pending).await {
            Ok(n) => n,
            Err(e) => {
                discard(&pending).await;
                return Err(e);
            }
        };
        self.commit(&pending, name).await?;
        fs::remove_file(src).await?;

        info!(name, stored_bytes = stored, "file imported");
        Ok(stored)
    }

    /// Open the container stored as `name` into a fresh scratch file.
    ///
    /// The scratch file is removed when the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if nothing is stored as `name`, and
    /// [`StorageError::Container`] if the container fails to open.
    pub async fn retrieve(&self, name: &str) -> Result<ScratchFile, StorageError> {
        validate_name(name)?;
        let scratch = self.scratch_file(name);
        decrypt_file(&self.codec, &self.container_path(name), scratch.path()).await?;
        debug!(name, "file decrypted to scratch");
        Ok(scratch)
    }

    /// A guard over a fresh, uniquely named scratch path for `name`.
    ///
    /// `name` must already have passed [`validate_name`].
    pub fn scratch_file(&self, name: &str) -> ScratchFile {
        ScratchFile::new(
            self.root
                .join(format!("{SCRATCH_PREFIX}{}_{name}", Uuid::new_v4().simple())),
        )
    }

    /// Names of all stored files, sorted, with the container suffix stripped.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be read.
    pub async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = match fs::read_dir(self.root.as_path()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(CONTAINER_SUFFIX) {
                if validate_name(name).is_ok() {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete scratch and pending files left behind by an earlier process.
    ///
    /// Returns how many files were removed.
    pub async fn purge_scratch(&self) -> Result<usize, StorageError> {
        let mut entries = fs::read_dir(self.root.as_path()).await?;
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let stale = file_name
                .to_str()
                .is_some_and(|n| n.starts_with(SCRATCH_PREFIX) || n.starts_with(PENDING_PREFIX));
            if stale && entry.file_type().await?.is_file() {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "purged stale scratch files");
        }
        Ok(removed)
    }

    fn container_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}{CONTAINER_SUFFIX}"))
    }

    fn pending_path(&self) -> PathBuf {
        self.root
            .join(format!("{PENDING_PREFIX}{}", Uuid::new_v4().simple()))
    }

    async fn commit(&self, pending: &Path, name: &str) -> Result<(), StorageError> {
        if let Err(e) = fs::rename(pending, self.container_path(name)).await {
            discard(pending).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Seal the plaintext file at `src` into a container at `dst`.
///
/// Returns the container size in bytes.
pub async fn encrypt_file(
    codec: &ContainerCodec,
    src: &Path,
    dst: &Path,
) -> Result<u64, StorageError> {
    let plaintext = fs::read(src).await?;
    let container = codec.seal(&plaintext)?;
    fs::write(dst, &container).await?;
    Ok(container.len() as u64)
}

/// Open the container at `src` and write its plaintext to `dst`.
///
/// Nothing is written to `dst` unless the container authenticates.
pub async fn decrypt_file(
    codec: &ContainerCodec,
    src: &Path,
    dst: &Path,
) -> Result<(), StorageError> {
    let container = match fs::read(src).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StorageError::NotFound),
        Err(e) => return Err(e.into()),
    };
    let plaintext = codec.open(&container)?;
    fs::write(dst, plaintext).await?;
    Ok(())
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "failed to discard pending file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{container::OVERHEAD, ContainerError};
    use crate::storage::MAX_NAME_LEN;
    use crate::key::SecretKey;

    fn codec(key: &[u8; 16]) -> Arc<ContainerCodec> {
        Arc::new(ContainerCodec::new(SecretKey::from_slice(key).unwrap()))
    }

    async fn storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path(), codec(b"0123456789abcdef"));
        storage.init().await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn store_then_retrieve() {
        let (dir, storage) = storage().await;
        let stored = storage.store("notes.txt", b"hello world").await.unwrap();
        assert_eq!(stored, (11 + OVERHEAD) as u64);

        let on_disk = std::fs::read(dir.path().join("notes.txt.enc")).unwrap();
        assert_eq!(on_disk.len(), 43);
        assert!(!on_disk.windows(11).any(|w| w == b"hello world"));

        let scratch = storage.retrieve("notes.txt").await.unwrap();
        assert_eq!(std::fs::read(scratch.path()).unwrap(), b"hello world");
        let scratch_path = scratch.path().to_path_buf();
        drop(scratch);
        assert!(!scratch_path.exists());
    }

    #[tokio::test]
    async fn store_replaces_existing_file() {
        let (_dir, storage) = storage().await;
        storage.store("a.txt", b"first").await.unwrap();
        storage.store("a.txt", b"second").await.unwrap();
        let scratch = storage.retrieve("a.txt").await.unwrap();
        assert_eq!(std::fs::read(scratch.path()).unwrap(), b"second");
    }

    #[tokio::test]
    async fn import_seals_and_removes_plaintext() {
        let (dir, storage) = storage().await;
        let src = dir.path().join("temp_incoming");
        std::fs::write(&src, b"uploaded bytes").unwrap();

        storage.import("upload.bin", &src).await.unwrap();
        assert!(!src.exists());

        let scratch = storage.retrieve("upload.bin").await.unwrap();
        assert_eq!(std::fs::read(scratch.path()).unwrap(), b"uploaded bytes");
    }

    #[tokio::test]
    async fn retrieve_missing_is_not_found() {
        let (_dir, storage) = storage().await;
        assert!(matches!(
            storage.retrieve("ghost.txt").await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn retrieve_with_other_key_fails_authentication() {
        let (dir, storage) = storage().await;
        storage.store("secret.txt", b"classified").await.unwrap();

        let other = Storage::new(dir.path(), codec(b"0123456789abcdeg"));
        assert!(matches!(
            other.retrieve("secret.txt").await,
            Err(StorageError::Container(ContainerError::Authentication))
        ));
        // A failed open leaves no scratch file behind.
        assert_eq!(other.purge_scratch().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn retrieve_truncated_container_is_malformed() {
        let (dir, storage) = storage().await;
        std::fs::write(dir.path().join("short.bin.enc"), [0u8; 10]).unwrap();
        assert!(matches!(
            storage.retrieve("short.bin").await,
            Err(StorageError::Container(ContainerError::Malformed(10)))
        ));
    }

    #[tokio::test]
    async fn invalid_names_are_rejected() {
        let (_dir, storage) = storage().await;
        assert!(matches!(
            storage.store("../escape", b"x").await,
            Err(StorageError::InvalidName)
        ));
        assert!(matches!(
            storage.retrieve("a/b").await,
            Err(StorageError::InvalidName)
        ));
    }

    #[tokio::test]
    async fn list_strips_suffix_and_skips_other_files() {
        let (dir, storage) = storage().await;
        storage.store("b.txt", b"b").await.unwrap();
        storage.store("a.txt", b"a").await.unwrap();
        std::fs::write(dir.path().join("temp_abc_a.txt"), b"scratch").unwrap();
        std::fs::write(dir.path().join("README"), b"not a container").unwrap();
        std::fs::create_dir(dir.path().join("sub.enc")).unwrap();

        assert_eq!(storage.list().await.unwrap(), vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn longest_valid_name_round_trips() {
        let (_dir, storage) = storage().await;
        let name = "x".repeat(MAX_NAME_LEN);
        storage.store(&name, b"long name").await.unwrap();
        let scratch = storage.retrieve(&name).await.unwrap();
        assert_eq!(std::fs::read(scratch.path()).unwrap(), b"long name");
        drop(scratch);
        assert_eq!(storage.list().await.unwrap(), vec![name]);
    }

    #[tokio::test]
    async fn name_one_byte_too_long_is_rejected() {
        let (dir, storage) = storage().await;
        let name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            storage.store(&name, b"x").await,
            Err(StorageError::InvalidName)
        ));
        assert!(matches!(
            storage.retrieve(&name).await,
            Err(StorageError::InvalidName)
        ));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn check_fails_once_directory_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");
        let storage = Storage::new(&root, codec(b"0123456789abcdef"));
        storage.init().await.unwrap();
        storage.check().await.unwrap();

        std::fs::remove_dir(&root).unwrap();
        assert!(matches!(storage.check().await, Err(StorageError::Io(_))));
    }

    #[tokio::test]
    async fn list_of_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("absent"), codec(b"0123456789abcdef"));
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_removes_only_stale_files() {
        let (dir, storage) = storage().await;
        storage.store("keep.txt", b"keep").await.unwrap();
        std::fs::write(dir.path().join("temp_1_keep.txt"), b"x").unwrap();
        std::fs::write(dir.path().join(".upload-deadbeef"), b"x").unwrap();

        assert_eq!(storage.purge_scratch().await.unwrap(), 2);
        assert_eq!(storage.list().await.unwrap(), vec!["keep.txt"]);
        assert!(dir.path().join("keep.txt.enc").exists());
    }

    #[tokio::test]
    async fn file_helpers_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let codec = codec(b"0123456789abcdef");
        let plain = dir.path().join("plain");
        let sealed = dir.path().join("sealed");
        let opened = dir.path().join("opened");
        std::fs::write(&plain, b"").unwrap();

        assert_eq!(
            encrypt_file(&codec, &plain, &sealed).await.unwrap(),
            OVERHEAD as u64
        );
        decrypt_file(&codec, &sealed, &opened).await.unwrap();
        assert!(std::fs::read(&opened).unwrap().is_empty());
    }

    #[tokio::test]
    async fn decrypt_file_writes_nothing_on_tamper() {
        let dir = tempfile::tempdir().unwrap();
        let codec = codec(b"0123456789abcdef");
        let sealed = dir.path().join("sealed");
        let opened = dir.path().join("opened");
        let mut container = codec.seal(b"integrity matters").unwrap();
        let last = container.len() - 1;
        container[last] ^= 0x80;
        std::fs::write(&sealed, &container).unwrap();

        assert!(decrypt_file(&codec, &sealed, &opened).await.is_err());
        assert!(!opened.exists());
    }
}
