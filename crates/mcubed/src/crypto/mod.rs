//! Encryption at rest for the database file.
//!
//! This module is intentionally free of persistence and HTTP dependencies.
//! It provides the key derivation and AEAD primitives used by the codec.

pub mod cipher;
pub mod key;

pub use cipher::{CipherError, Sealed};
pub use key::{KdfParams, KeyBytes};
