//! Whole-database persistence.
//!
//! A [`Codec`] loads the entire [`Database`] at startup and writes the entire
//! database back after every mutation. There is no partial persistence.

pub mod file;
#[cfg(test)]
pub mod memory;

pub use file::EncryptedFile;

use std::path::PathBuf;

use thiserror::Error;

use crate::crypto::CipherError;
use crate::store::Database;

/// Errors from loading or saving the database.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The backing file exists but cannot be decrypted or parsed under the
    /// configured passphrase. Fatal at startup.
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// Reading or writing the backing file failed.
    #[error("i/o error on database file: {0}")]
    Io(#[from] std::io::Error),

    /// Encryption failed while saving.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// The database could not be serialised.
    #[error("failed to serialise database: {0}")]
    Serialise(#[from] serde_json::Error),
}

/// Load/save of the whole database.
#[cfg_attr(test, mockall::automock)]
pub trait Codec: Send {
    /// Load the database. A missing backing store yields a fresh
    /// [`Database::default`].
    fn load(&mut self) -> Result<Database, CodecError>;

    /// Overwrite the backing store with `db`.
    fn save(&mut self, db: &Database) -> Result<(), CodecError>;
}

impl<C: Codec + ?Sized> Codec for Box<C> {
    fn load(&mut self) -> Result<Database, CodecError> {
        (**self).load()
    }

    fn save(&mut self, db: &Database) -> Result<(), CodecError> {
        (**self).save(db)
    }
}
