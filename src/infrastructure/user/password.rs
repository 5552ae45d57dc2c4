//! Password hashing with Argon2id
//!
//! Hash and salt are kept as raw bytes so the cost parameters are never
//! encoded next to the hash; they come from [`HasherConfig`] and are fixed
//! system-wide. Changing them makes previously stored hashes unverifiable.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use std::fmt::Debug;
use subtle::ConstantTimeEq;

use crate::config::HasherConfig;
use crate::domain::{HashError, HashedPassword};

/// Trait for password hashing operations
pub trait PasswordHasher: Send + Sync + Debug {
    /// Hash a password
    ///
    /// A random salt is generated when `salt` is `None` or empty. A supplied
    /// salt shorter than the Argon2 minimum of 8 bytes is rejected with
    /// [`HashError::InvalidSalt`] rather than hashed.
    fn generate_hash(
        &self,
        password: &[u8],
        salt: Option<&[u8]>,
    ) -> Result<HashedPassword, HashError>;

    /// Check a password against a stored hash and salt in constant time
    fn compare(&self, hash: &[u8], salt: &[u8], password: &[u8]) -> Result<(), HashError>;
}

/// Argon2id-based password hasher
#[derive(Debug, Clone)]
pub struct Argon2idHasher {
    params: Params,
    salt_length: usize,
    key_length: usize,
}

impl Argon2idHasher {
    /// Create a hasher, validating the cost parameters up front
    pub fn new(config: &HasherConfig) -> Result<Self, HashError> {
        let params = Params::new(
            config.memory_kib,
            config.time_cost,
            config.parallelism,
            Some(config.key_length),
        )
        .map_err(|e| HashError::params(e.to_string()))?;

        Ok(Self {
            params,
            salt_length: config.salt_length,
            key_length: config.key_length,
        })
    }

    fn derive(&self, password: &[u8], salt: &[u8]) -> Result<Vec<u8>, HashError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let mut out = vec![0u8; self.key_length];

        argon2
            .hash_password_into(password, salt, &mut out)
            .map_err(|e| match e {
                argon2::Error::SaltTooShort | argon2::Error::SaltTooLong => HashError::InvalidSalt,
                argon2::Error::PwdTooLong => HashError::InvalidPassword,
                other => HashError::params(other.to_string()),
            })?;

        Ok(out)
    }

    fn random_salt(&self) -> Vec<u8> {
        let mut salt = vec![0u8; self.salt_length];
        rand::thread_rng().fill_bytes(&mut salt);
        salt
    }
}

impl PasswordHasher for Argon2idHasher {
    fn generate_hash(
        &self,
        password: &[u8],
        salt: Option<&[u8]>,
    ) -> Result<HashedPassword, HashError> {
        if password.is_empty() {
            return Err(HashError::InvalidPassword);
        }

        let salt = match salt {
            Some(salt) if !salt.is_empty() => salt.to_vec(),
            _ => self.random_salt(),
        };

        if salt.is_empty() {
            return Err(HashError::InvalidSalt);
        }

        let hash = self.derive(password, &salt)?;

        Ok(HashedPassword::new(hash, salt))
    }

    fn compare(&self, hash: &[u8], salt: &[u8], password: &[u8]) -> Result<(), HashError> {
        if hash.is_empty() {
            return Err(HashError::InvalidHash);
        }

        if salt.is_empty() {
            return Err(HashError::InvalidSalt);
        }

        if password.is_empty() {
            return Err(HashError::InvalidPassword);
        }

        let candidate = self.derive(password, salt)?;

        if bool::from(candidate.as_slice().ct_eq(hash)) {
            Ok(())
        } else {
            Err(HashError::PasswordNotMatch)
        }
    }
}
