//! Password hashing and verification
//!
//! Verifiers are argon2id PHC strings. The salt is drawn fresh for every
//! hash, so hashing the same password twice yields different verifiers that
//! both verify.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString},
};

use crate::error::CredentialError;

/// Stateless argon2 wrapper shared through the application state
#[derive(Clone, Default)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
}

impl CredentialVerifier {
    /// Verifier with the argon2 default cost parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifier with explicit memory (KiB) and iteration costs
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, CredentialError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password into a PHC verifier string
    pub fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored verifier
    ///
    /// A mismatch is `Ok(false)`; only a verifier that cannot be parsed or
    /// evaluated is an error.
    pub fn verify(&self, plaintext: &str, verifier: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(verifier)
            .map_err(|e| CredentialError::MalformedVerifier(e.to_string()))?;

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CredentialError::MalformedVerifier(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::with_cost(64, 1).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let verifier = verifier();
        let hash = assert_ok!(verifier.hash("S3cret!pass"));

        assert!(hash.starts_with("$argon2id$"));
        assert!(assert_ok!(verifier.verify("S3cret!pass", &hash)));
        assert!(!assert_ok!(verifier.verify("wrong-pass", &hash)));
    }

    #[test]
    fn hashing_is_salted() {
        let verifier = verifier();
        let first = verifier.hash("same").unwrap();
        let second = verifier.hash("same").unwrap();

        assert_ne!(first, second);
        assert!(verifier.verify("same", &second).unwrap());
    }

    #[test]
    fn default_cost_verifies_low_cost_hashes() {
        let hash = verifier().hash("portable").unwrap();
        assert!(CredentialVerifier::new().verify("portable", &hash).unwrap());
    }

    #[test]
    fn malformed_verifier_is_an_error() {
        let result = verifier().verify("anything", "not-a-phc-string");
        assert!(matches!(
            assert_err!(result),
            CredentialError::MalformedVerifier(_)
        ));
    }

    #[test]
    fn invalid_cost_is_rejected() {
        assert!(CredentialVerifier::with_cost(1, 0).is_err());
    }
}
