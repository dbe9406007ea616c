//! [`EncryptedFile`]: the database as one passphrase-encrypted file on disk.
//!
//! # File format
//!
//! ```text
//! {
//!   "version": 1,
//!   "kdf": { "m_cost": …, "t_cost": …, "p_cost": …, "salt": "<base64url>" },
//!   "nonce": "<base64url>",
//!   "ciphertext": "<base64url(AES-256-GCM-SIV(json(database)))>"
//! }
//! ```
//!
//! The salt is fixed for the life of the file; every save draws a new nonce.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Codec, CodecError};
use crate::crypto::cipher::{self, NONCE_LEN};
use crate::crypto::key::{self, SALT_LEN};
use crate::crypto::{KdfParams, KeyBytes, Sealed};
use crate::store::Database;

/// Current envelope version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    kdf: KdfSection,
    nonce: String,
    ciphertext: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct KdfSection {
    #[serde(flatten)]
    params: KdfParams,
    salt: String,
}

/// Key material bound to one file: the salt it was derived with and the key.
struct DerivedKey {
    salt: [u8; SALT_LEN],
    params: KdfParams,
    key: KeyBytes,
}

/// Encrypted single-file [`Codec`].
pub struct EncryptedFile {
    path: PathBuf,
    passphrase: String,
    params: KdfParams,
    derived: Option<DerivedKey>,
}

impl std::fmt::Debug for EncryptedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFile")
            .field("path", &self.path)
            .field("passphrase", &"[REDACTED]")
            .field("params", &self.params)
            .finish()
    }
}

impl EncryptedFile {
    /// A codec for `path` under `passphrase` with default KDF costs.
    pub fn new(path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self::with_params(path, passphrase, KdfParams::default())
    }

    /// A codec with explicit KDF costs for newly created files. Existing files
    /// are always opened with the costs recorded in them.
    pub fn with_params(path: impl Into<PathBuf>, passphrase: impl Into<String>, params: KdfParams) -> Self {
        Self {
            path: path.into(),
            passphrase: passphrase.into(),
            params,
            derived: None,
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn unreadable(&self, reason: impl Into<String>) -> CodecError {
        CodecError::Unreadable {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn decode_fixed<const N: usize>(&self, field: &str, value: &str) -> Result<[u8; N], CodecError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|_| self.unreadable(format!("{field} is not valid base64")))?;
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| self.unreadable(format!("{field} has length {}, expected {N}", b.len())))
    }

    fn decrypt(&self, text: &str) -> Result<(Database, DerivedKey), CodecError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| self.unreadable(format!("malformed envelope: {e}")))?;
        if envelope.version != FORMAT_VERSION {
            return Err(self.unreadable(format!("unsupported format version {}", envelope.version)));
        }

        let salt: [u8; SALT_LEN] = self.decode_fixed("salt", &envelope.kdf.salt)?;
        let nonce: [u8; NONCE_LEN] = self.decode_fixed("nonce", &envelope.nonce)?;
        let ciphertext = URL_SAFE_NO_PAD
            .decode(&envelope.ciphertext)
            .map_err(|_| self.unreadable("ciphertext is not valid base64"))?;

        let params = envelope.kdf.params;
        let key = key::derive_key(&self.passphrase, &salt, params)
            .map_err(|e| self.unreadable(e.to_string()))?;
        let plaintext = cipher::open(&Sealed { nonce, ciphertext }, &key.0[..])
            .map_err(|_| self.unreadable("wrong passphrase or corrupted data"))?;
        let db: Database = serde_json::from_slice(&plaintext)
            .map_err(|e| self.unreadable(format!("decrypted content is not a database: {e}")))?;

        Ok((db, DerivedKey { salt, params, key }))
    }

    /// A new key under a fresh salt, for a file that has never been written.
    fn fresh_key(&self) -> Result<DerivedKey, CodecError> {
        let salt = key::generate_salt();
        let key = key::derive_key(&self.passphrase, &salt, self.params)?;
        Ok(DerivedKey {
            salt,
            params: self.params,
            key,
        })
    }

    /// The key loaded with the file, deriving a fresh one if `load` never ran.
    fn key_for_save(&mut self) -> Result<&DerivedKey, CodecError> {
        let derived = match self.derived.take() {
            Some(derived) => derived,
            None => self.fresh_key()?,
        };
        Ok(self.derived.insert(derived))
    }

    /// `<path>.tmp`, next to the database file.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl Codec for EncryptedFile {
    fn load(&mut self) -> Result<Database, CodecError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no database file yet; starting empty");
                // Derive now so the first save does no key stretching.
                self.derived = Some(self.fresh_key()?);
                return Ok(Database::default());
            }
            Err(e) => return Err(e.into()),
        };
        let (db, derived) = self.decrypt(&text)?;
        self.derived = Some(derived);
        debug!(path = %self.path.display(), "database loaded");
        Ok(db)
    }

    fn save(&mut self, db: &Database) -> Result<(), CodecError> {
        let plaintext = serde_json::to_vec(db)?;
        let derived = self.key_for_save()?;
        let sealed = cipher::seal(&plaintext, &derived.key.0[..])?;

        let envelope = Envelope {
            version: FORMAT_VERSION,
            kdf: KdfSection {
                params: derived.params,
                salt: URL_SAFE_NO_PAD.encode(derived.salt),
            },
            nonce: URL_SAFE_NO_PAD.encode(sealed.nonce),
            ciphertext: URL_SAFE_NO_PAD.encode(&sealed.ciphertext),
        };

        // Write-then-rename so a crash mid-save never leaves a truncated file.
        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_vec(&envelope)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), bytes = plaintext.len(), "database saved");
        Ok(())
    }
}
