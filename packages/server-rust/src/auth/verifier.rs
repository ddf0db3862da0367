//! One-way secret hashing and verification.
//!
//! New hashes are Argon2id in PHC string format with an `OsRng` salt.
//! Verification also accepts bcrypt (`$2a$`, `$2b$`, `$2x$`, `$2y$`) so
//! hashes written by the legacy back office keep working.
//!
//! `verify` is total: a malformed or unrecognised stored hash is a
//! non-match, never an error. Neither the presented secret nor the stored
//! hash is ever logged here.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use super::error::AuthError;

/// Hash families recognised by their prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashScheme {
    Argon2,
    Bcrypt,
}

impl HashScheme {
    fn detect(stored: &str) -> Option<Self> {
        if stored.starts_with("$argon2id$")
            || stored.starts_with("$argon2i$")
            || stored.starts_with("$argon2d$")
        {
            Some(Self::Argon2)
        } else if ["$2a$", "$2b$", "$2x$", "$2y$"]
            .iter()
            .any(|p| stored.starts_with(p))
        {
            Some(Self::Bcrypt)
        } else {
            None
        }
    }
}

/// Stateless secret verifier.
///
/// The Argon2 parameters only affect hashes produced by [`CredentialVerifier::hash`];
/// verification always uses the algorithm, version, salt and cost embedded
/// in the stored hash.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    params: Params,
}

impl CredentialVerifier {
    /// Verifier producing hashes with the crate's default Argon2id cost.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Verifier producing hashes with custom Argon2id cost parameters.
    #[must_use]
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    /// Returns `true` only if `presented` hashes to `stored_hash`.
    #[must_use]
    pub fn verify(&self, presented: &str, stored_hash: &str) -> bool {
        self.check(presented, stored_hash).is_ok()
    }

    /// Like [`verify`](Self::verify) but keeps the reason for a non-match.
    ///
    /// # Errors
    ///
    /// `MalformedStoredHash` when the stored hash cannot be parsed,
    /// `CredentialMismatch` when it parses but does not match.
    pub fn check(&self, presented: &str, stored_hash: &str) -> Result<(), AuthError> {
        match HashScheme::detect(stored_hash) {
            Some(HashScheme::Argon2) => {
                let parsed =
                    PasswordHash::new(stored_hash).map_err(|_| AuthError::MalformedStoredHash)?;
                if parsed.salt.is_none() || parsed.hash.is_none() {
                    return Err(AuthError::MalformedStoredHash);
                }
                match Argon2::default().verify_password(presented.as_bytes(), &parsed) {
                    Ok(()) => Ok(()),
                    Err(argon2::password_hash::Error::Password) => {
                        Err(AuthError::CredentialMismatch)
                    }
                    Err(_) => Err(AuthError::MalformedStoredHash),
                }
            }
            Some(HashScheme::Bcrypt) => match bcrypt::verify(presented, stored_hash) {
                Ok(true) => Ok(()),
                Ok(false) => Err(AuthError::CredentialMismatch),
                Err(_) => Err(AuthError::MalformedStoredHash),
            },
            None => Err(AuthError::MalformedStoredHash),
        }
    }

    /// Hashes `secret` into an Argon2id PHC string with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hashing` if the hasher rejects its parameters.
    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let hash = argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }
}

impl Default for CredentialVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn cheap_verifier() -> CredentialVerifier {
    // Minimum legal Argon2 cost; keeps tests fast.
    CredentialVerifier::with_params(Params::new(8, 1, 1, None).unwrap())
}
