//! Passphrase-derived encryption keys.
//!
//! The database key is derived from the operator's passphrase with Argon2id.
//! The salt and cost parameters are stored alongside the ciphertext so a file
//! can always be reopened with the parameters it was written with.

use aes_gcm_siv::aead::{rand_core::RngCore, OsRng};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use super::cipher::{CipherError, KEY_LEN};

/// Byte length of the random KDF salt.
pub const SALT_LEN: usize = 16;

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
#[derive(Clone)]
pub struct KeyBytes(pub Box<[u8; KEY_LEN]>);

impl Drop for KeyBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Number of passes.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

/// Derive a [`KEY_LEN`]-byte key from `passphrase` and `salt`.
///
/// # Errors
///
/// Returns [`CipherError::KeyDerivation`] if the parameters are out of range or
/// the salt is too short.
pub fn derive_key(passphrase: &str, salt: &[u8], params: KdfParams) -> Result<KeyBytes, CipherError> {
    let argon_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(KEY_LEN))
        .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = KeyBytes(Box::new([0u8; KEY_LEN]));
    argon
        .hash_password_into(passphrase.as_bytes(), salt, &mut key.0[..])
        .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Generate a random salt from the OS CSPRNG.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEAP: KdfParams = KdfParams {
        m_cost: 8,
        t_cost: 1,
        p_cost: 1,
    };

    #[test]
    fn same_inputs_derive_same_key() {
        let salt = generate_salt();
        let a = derive_key("hunter2", &salt, CHEAP).unwrap();
        let b = derive_key("hunter2", &salt, CHEAP).unwrap();
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn different_passphrase_derives_different_key() {
        let salt = generate_salt();
        let a = derive_key("hunter2", &salt, CHEAP).unwrap();
        let b = derive_key("hunter3", &salt, CHEAP).unwrap();
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn rejects_out_of_range_params() {
        let bad = KdfParams {
            m_cost: 8,
            t_cost: 0,
            p_cost: 1,
        };
        assert!(derive_key("x", &generate_salt(), bad).is_err());
    }

    #[test]
    fn key_bytes_redacted_in_debug() {
        let key = KeyBytes(Box::new([0xFF; KEY_LEN]));
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
