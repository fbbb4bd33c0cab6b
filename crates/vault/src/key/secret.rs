//! [`SecretKey`]: fixed-size, self-erasing holder for the encryption key.

use sha2::{Digest, Sha256};

use super::KeyError;
use crate::crypto::KEY_LEN;

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which key material lives in RAM.
pub struct SecretKey(Box<[u8; KEY_LEN]>);

impl SecretKey {
    /// Copy `bytes` into a new key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if the slice is not [`KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    /// Hex of the first 8 bytes of SHA-256 over the key.
    ///
    /// Identifies which key a deployment runs with without revealing it.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.as_bytes());
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("SecretKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            SecretKey::from_slice(&[0u8; 15]),
            Err(KeyError::InvalidLength(15))
        ));
        assert!(SecretKey::from_slice(&[0u8; 17]).is_err());
    }

    #[test]
    fn redacted_in_debug() {
        let key = SecretKey::from_slice(b"0123456789abcdef").unwrap();
        let out = format!("{key:?}");
        assert!(out.contains("REDACTED"));
        assert!(!out.contains("0123"));
    }

    #[test]
    fn fingerprint_is_stable_and_key_specific() {
        let a = SecretKey::from_slice(b"0123456789abcdef").unwrap();
        let b = SecretKey::from_slice(b"0123456789abcdeg").unwrap();
        assert_eq!(a.fingerprint(), a.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
