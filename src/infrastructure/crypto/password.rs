//! Password hashing utilities
//!
//! New accounts store bcrypt hashes. Rows written before hashing was
//! introduced hold the password itself in the `password` column; those are
//! matched exactly.

use bcrypt::{hash, verify, HashParts};
use tracing::debug;

use crate::shared::InfraError;

/// bcrypt only reads this many bytes of input; anything past it is ignored.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password using bcrypt with the configured cost
pub fn hash_password(password: &str, cost: u32) -> Result<String, InfraError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(InfraError::Crypto(format!(
            "password is longer than {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    hash(password, cost).map_err(|e| InfraError::Crypto(e.to_string()))
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, InfraError> {
    verify(password, hash).map_err(|e| InfraError::Crypto(e.to_string()))
}

/// True when `stored` parses as a bcrypt hash string.
pub fn is_bcrypt_hash(stored: &str) -> bool {
    stored.starts_with("$2") && stored.parse::<HashParts>().is_ok()
}

/// Check a login attempt against the stored `password` column.
///
/// A bcrypt value is verified, refusing input bcrypt would truncate so two
/// passwords sharing a 72-byte prefix never match each other. Anything else
/// is a legacy plaintext value and must be equal byte for byte.
pub fn password_matches(password: &str, stored: &str) -> bool {
    if !is_bcrypt_hash(stored) {
        return password == stored;
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return false;
    }
    match verify_password(password, stored) {
        Ok(valid) => valid,
        Err(e) => {
            debug!(error = %e, "bcrypt verification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "secure_password_123";
        let hashed = hash_password(password, 4).unwrap();

        assert_ne!(hashed, password);
        assert!(verify_password(password, &hashed).unwrap());
        assert!(!verify_password("wrong_password", &hashed).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("p1", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn hashes_are_recognised() {
        let hashed = hash_password("p1", 4).unwrap();
        assert!(is_bcrypt_hash(&hashed));
        assert!(!is_bcrypt_hash("p1"));
        assert!(!is_bcrypt_hash("$2b$not-really"));
    }

    #[test]
    fn plaintext_values_match_exactly() {
        assert!(password_matches("p1", "p1"));
        assert!(!password_matches("p2", "p1"));
        assert!(!password_matches("p1 ", "p1"));
        assert!(!password_matches("P1", "p1"));
    }

    #[test]
    fn long_passwords_are_not_hashed() {
        let long = format!("{}A", "x".repeat(MAX_PASSWORD_BYTES));
        assert!(hash_password(&long, 4).is_err());
        assert!(hash_password(&"x".repeat(MAX_PASSWORD_BYTES), 4).is_ok());
    }

    #[test]
    fn shared_prefix_beyond_limit_does_not_match() {
        let prefix = "x".repeat(MAX_PASSWORD_BYTES);
        // What bcrypt would have stored for `prefix + "A"`.
        let stored = bcrypt::hash(format!("{}A", prefix), 4).unwrap();

        assert!(!password_matches(&format!("{}B", prefix), &stored));
        assert!(!password_matches(&format!("{}A", prefix), &stored));
    }
}
