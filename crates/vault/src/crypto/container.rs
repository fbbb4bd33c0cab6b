//! Sealing and opening of `nonce || tag || ciphertext` containers.
//!
//! **Algorithm choice:** AES-128 in EAX mode with a 128-bit nonce and a
//! 128-bit tag, no associated data. Every seal draws a fresh nonce from the OS
//! CSPRNG; there is no nonce counter or reuse detector, so uniqueness rests
//! entirely on the randomness source.

use aes::Aes128;
use eax::aead::{
    generic_array::typenum::Unsigned, AeadCore, AeadInPlace, KeyInit, Nonce, OsRng, Tag,
};
use eax::Eax;
use thiserror::Error;

use crate::key::SecretKey;

type Aes128Eax = Eax<Aes128>;

/// Byte length of an AES-128 key.
pub const KEY_LEN: usize = 16;

/// Byte length of the EAX nonce stored at the head of a container.
pub const NONCE_LEN: usize = 16;

/// Byte length of the EAX authentication tag following the nonce.
pub const TAG_LEN: usize = 16;

/// Fixed number of bytes a container adds on top of its plaintext.
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;

// The positional layout is only valid for the primitive it was written with.
const _: () = assert!(NONCE_LEN == <<Aes128Eax as AeadCore>::NonceSize as Unsigned>::USIZE);
const _: () = assert!(TAG_LEN == <<Aes128Eax as AeadCore>::TagSize as Unsigned>::USIZE);
const _: () = assert!(KEY_LEN == <<Aes128Eax as eax::aead::KeySizeUser>::KeySize as Unsigned>::USIZE);

/// Errors produced by the container layer.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes). This is a
    /// configuration error and should stop startup rather than fail a request.
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The container is shorter than the fixed nonce + tag overhead.
    #[error("malformed container: {0} bytes is shorter than the {OVERHEAD}-byte header")]
    Malformed(usize),

    /// Tag verification failed: wrong key, or tampered/truncated data.
    #[error("container authentication failed")]
    Authentication,

    /// EAX encryption failed. Unreachable with a valid key and nonce.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Seal `plaintext` under `key`, returning `nonce || tag || ciphertext`.
///
/// The returned container is exactly `plaintext.len() + OVERHEAD` bytes and
/// differs on every call, even for identical input.
///
/// # Errors
///
/// Returns [`ContainerError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
pub fn seal(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, ContainerError> {
    let cipher = build_cipher(key)?;
    let nonce = Aes128Eax::generate_nonce(&mut OsRng);

    let mut container = Vec::with_capacity(OVERHEAD + plaintext.len());
    container.extend_from_slice(&nonce);
    container.extend_from_slice(&[0u8; TAG_LEN]);
    container.extend_from_slice(plaintext);

    let tag = cipher
        .encrypt_in_place_detached(&nonce, b"", &mut container[OVERHEAD..])
        .map_err(|_| ContainerError::AeadFailure)?;
    container[NONCE_LEN..OVERHEAD].copy_from_slice(&tag);

    Ok(container)
}

/// Verify and decrypt a container produced by [`seal`].
///
/// No plaintext is returned unless the tag verifies.
///
/// # Errors
///
/// Returns [`ContainerError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`ContainerError::Malformed`] if `container` is shorter than [`OVERHEAD`].
/// Returns [`ContainerError::Authentication`] if the tag does not verify.
pub fn open(container: &[u8], key: &[u8]) -> Result<Vec<u8>, ContainerError> {
    let cipher = build_cipher(key)?;
    if container.len() < OVERHEAD {
        return Err(ContainerError::Malformed(container.len()));
    }

    let (nonce, rest) = container.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let mut plaintext = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::<Aes128Eax>::from_slice(nonce),
            b"",
            &mut plaintext,
            Tag::<Aes128Eax>::from_slice(tag),
        )
        .map_err(|_| ContainerError::Authentication)?;

    Ok(plaintext)
}

fn build_cipher(key: &[u8]) -> Result<Aes128Eax, ContainerError> {
    if key.len() != KEY_LEN {
        return Err(ContainerError::InvalidKeyLength(key.len()));
    }
    Aes128Eax::new_from_slice(key).map_err(|_| ContainerError::InvalidKeyLength(key.len()))
}

/// Seals and opens containers with a key injected once at startup.
///
/// Holds no mutable state, so a single codec can be shared across any number
/// of concurrent requests behind an `Arc`.
#[derive(Debug)]
pub struct ContainerCodec {
    key: SecretKey,
}

impl ContainerCodec {
    /// Create a codec bound to `key`.
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    /// Non-secret identifier of the bound key, safe to log.
    pub fn key_id(&self) -> String {
        self.key.fingerprint()
    }

    /// See [`seal`].
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, ContainerError> {
        seal(plaintext, self.key.as_bytes())
    }

    /// See [`open`].
    pub fn open(&self, container: &[u8]) -> Result<Vec<u8>, ContainerError> {
        open(container, self.key.as_bytes())
    }
}
