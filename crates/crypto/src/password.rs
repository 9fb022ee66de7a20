use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::constant_time_eq;

/// Peppered SHA-256 password hashing.
///
/// Stored form is lowercase hex of `SHA-256(pepper || password)`.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    pepper: SecretString,
}

impl PasswordHasher {
    pub fn new(pepper: SecretString) -> Self {
        Self { pepper }
    }

    /// Whether a non-empty pepper is configured.
    pub fn has_pepper(&self) -> bool {
        !self.pepper.expose_secret().is_empty()
    }

    pub fn hash(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.pepper.expose_secret().as_bytes());
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Compare `password` against a stored hash in constant time.
    ///
    /// An empty stored hash never matches.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        if stored_hash.is_empty() {
            return false;
        }
        constant_time_eq(&self.hash(password), &stored_hash.to_ascii_lowercase())
    }
}
