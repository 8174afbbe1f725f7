//! One-way password hashing behind a small trait seam.

use thiserror::Error;

/// Work-factor range bcrypt accepts.
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Hash + verify primitive used by registration and login.
///
/// Implementations must be one-way and compare in constant time.
pub trait CredentialService: Send + Sync {
    /// Hash a plaintext password for storage.
    fn hash(&self, password: &str) -> Result<String, CredentialError>;

    /// Check a plaintext password against a stored hash.
    ///
    /// `Ok(false)` means a well-formed hash that does not match.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, CredentialError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid work factor {0} (expected {min}..={max})", min = MIN_COST, max = MAX_COST)]
    InvalidCost(u32),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("stored hash is malformed: {0}")]
    MalformedHash(String),
}

/// bcrypt-backed [`CredentialService`].
#[derive(Debug, Clone, Copy)]
pub struct BcryptCredentials {
    cost: u32,
}

impl BcryptCredentials {
    pub fn new(cost: u32) -> Result<Self, CredentialError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(CredentialError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }
}

impl Default for BcryptCredentials {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl CredentialService for BcryptCredentials {
    fn hash(&self, password: &str) -> Result<String, CredentialError> {
        bcrypt::hash(password, self.cost).map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, CredentialError> {
        match bcrypt::verify(password, hash) {
            Ok(matches) => Ok(matches),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash could not be parsed");
                Err(CredentialError::MalformedHash(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> BcryptCredentials {
        BcryptCredentials::new(MIN_COST).unwrap()
    }

    #[test]
    fn hash_is_not_the_plaintext_and_verifies() {
        let creds = fast();
        let hash = creds.hash("correct horse").unwrap();

        assert_ne!(hash, "correct horse");
        assert!(creds.verify("correct horse", &hash).unwrap());
        assert!(!creds.verify("battery staple", &hash).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let creds = fast();
        assert_ne!(creds.hash("p").unwrap(), creds.hash("p").unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        let err = fast().verify("p", "plaintext-not-a-hash").unwrap_err();
        assert!(matches!(err, CredentialError::MalformedHash(_)));
    }

    #[test]
    fn cost_outside_bcrypt_range_is_rejected() {
        assert_eq!(
            BcryptCredentials::new(2).unwrap_err(),
            CredentialError::InvalidCost(2)
        );
        assert!(BcryptCredentials::new(40).is_err());
    }

    #[test]
    fn cost_bounds_are_inclusive() {
        assert!(BcryptCredentials::new(MIN_COST).is_ok());
        assert!(BcryptCredentials::new(MAX_COST).is_ok());
        assert_eq!(
            BcryptCredentials::new(MAX_COST + 1).unwrap_err(),
            CredentialError::InvalidCost(MAX_COST + 1)
        );
        assert_eq!(
            CredentialError::InvalidCost(3).to_string(),
            "invalid work factor 3 (expected 4..=31)"
        );
    }
}
