//! AES-128-EAX container encryption primitives.
//!
//! This module is intentionally free of filesystem and HTTP dependencies.
//! It provides the in-memory seal/open transforms used by the storage layer.
//!
//! # Container format
//!
//! ```text
//! offset 0..15   : nonce (16 bytes, raw)
//! offset 16..31  : authentication tag (16 bytes, raw)
//! offset 32..end : ciphertext
//! ```
//!
//! There is no magic, version byte, or algorithm identifier. The layout is
//! positional and must stay bit-compatible with containers already on disk.

pub mod container;

pub use container::{ContainerCodec, ContainerError, KEY_LEN};
