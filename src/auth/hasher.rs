//! One-way password hashing.
//!
//! Stored hashes are PHC strings, so verification always uses the parameters
//! recorded in the hash itself. Tuning [`Params`] only affects new hashes.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};
use secrecy::{ExposeSecret, SecretSlice};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to initialize Argon2id: {0}")]
    Init(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hashing primitive used for stored credentials.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into an opaque, self-describing string.
    ///
    /// # Errors
    /// Returns an error if the hasher cannot be initialized or fails.
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// Check a plaintext password against a stored hash.
    ///
    /// Malformed stored hashes verify as `false`.
    fn verify(&self, password: &str, hashed_password: &str) -> bool;
}

/// Argon2id hasher with an optional server-side pepper.
pub struct Argon2Hasher {
    pepper: Option<SecretSlice<u8>>,
    params: Params,
}

impl Argon2Hasher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pepper: None,
            params: Params::default(),
        }
    }

    #[must_use]
    pub fn with_pepper(mut self, pepper: Vec<u8>) -> Self {
        self.pepper = (!pepper.is_empty()).then(|| SecretSlice::from(pepper));
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    fn argon2(&self) -> Result<Argon2<'_>, HashError> {
        match &self.pepper {
            Some(pepper) => Argon2::new_with_secret(
                pepper.expose_secret(),
                Algorithm::Argon2id,
                Version::V0x13,
                self.params.clone(),
            )
            .map_err(|err| HashError::Init(err.to_string())),
            None => Ok(Argon2::new(
                Algorithm::Argon2id,
                Version::V0x13,
                self.params.clone(),
            )),
        }
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| HashError::Hash(err.to_string()))?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, password: &str, hashed_password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hashed_password) else {
            return false;
        };
        self.argon2()
            .is_ok_and(|argon2| argon2.verify_password(password.as_bytes(), &parsed).is_ok())
    }
}
