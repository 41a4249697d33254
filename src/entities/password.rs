//! Argon2id password hashing for user credentials
//!
//! Uses OWASP-recommended Argon2id parameters:
//! m=19456 (19 MiB), t=2, p=1.

use crate::core::error::{AdminError, AdminResult};
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

/// Hash plus the salt it was generated with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword {
    /// PHC string (`$argon2id$v=19$...`)
    pub hash: String,
    pub salt: String,
}

/// Argon2id hasher
#[derive(Clone)]
pub struct PasswordCrypto {
    argon2: Argon2<'static>,
}

impl PasswordCrypto {
    pub fn new() -> Self {
        let params = Params::new(19456, 2, 1, None).unwrap_or_else(|_| Params::default());
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash a password with a freshly generated salt
    pub fn hash(&self, password: &str) -> AdminResult<HashedPassword> {
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|error| AdminError::Internal(format!("failed to hash password: {error}")))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
            salt: salt.as_str().to_string(),
        })
    }

    /// Check a password against a stored PHC hash
    pub fn verify(&self, password: &str, hash: &str) -> AdminResult<bool> {
        let parsed = PasswordHash::new(hash).map_err(|error| {
            AdminError::Internal(format!("failed to parse password hash: {error}"))
        })?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(error) => Err(AdminError::Internal(format!(
                "password verification failed: {error}"
            ))),
        }
    }
}

impl Default for PasswordCrypto {
    fn default() -> Self {
        Self::new()
    }
}
