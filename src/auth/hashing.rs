//! Password hashing with Argon2id.

use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        // OWASP minimum for Argon2id: 19 MiB, two passes, one lane.
        Self { memory_kib: 19_456, iterations: 2, parallelism: 1 }
    }
}

impl PasswordHashConfig {
    /// Cheapest parameters Argon2 accepts. Only for tests.
    pub fn insecure_fast() -> Self {
        Self { memory_kib: 8, iterations: 1, parallelism: 1 }
    }
}

/// One-way credential hasher shared by registration, login and password change.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Arc<Argon2<'static>>,
    dummy_hash: Arc<str>,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

impl CredentialHasher {
    pub fn new(config: &PasswordHashConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|err| Error::config(format!("Invalid Argon2 parameters: {}", err)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"erpgate-timing-equaliser", &salt)
            .map_err(|err| Error::internal(format!("Failed to hash password: {}", err)))?
            .to_string();

        Ok(Self { argon2: Arc::new(argon2), dummy_hash: Arc::from(dummy_hash) })
    }

    /// Hash a plaintext password into a self-describing PHC string with a fresh salt.
    pub fn hash_password(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|err| Error::internal(format!("Failed to hash password: {}", err)))?;
        Ok(hash.to_string())
    }

    /// Constant-time check of a candidate against a stored digest.
    ///
    /// A mismatch is `Ok(false)`; only an unparseable digest is an error.
    pub fn verify_password(&self, plaintext: &str, digest: &str) -> Result<bool> {
        let parsed = PasswordHash::new(digest)
            .map_err(|err| Error::internal(format!("Invalid password hash: {}", err)))?;
        Ok(self.argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok())
    }

    /// Burn one verification against a throwaway hash so that a lookup miss
    /// costs the same as a wrong password.
    pub fn equalise_timing(&self, plaintext: &str) {
        if let Err(err) = self.verify_password(plaintext, &self.dummy_hash) {
            tracing::warn!(error = %err, "dummy hash verification failed unexpectedly");
        }
    }
}
