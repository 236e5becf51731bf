//! One-way password hashing, wrapping bcrypt.

use crate::error::AppError;

/// Hash a plaintext secret at the default cost (12).
pub fn hash(plain: &str) -> Result<String, AppError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Compare a plaintext secret against a stored hash.
///
/// Malformed stored hashes count as a mismatch rather than an error, so a
/// corrupt row cannot be told apart from a wrong password by the caller.
pub fn verify(plain: &str, hashed: &str) -> bool {
    bcrypt::verify(plain, hashed).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        // Low cost keeps the test fast; production path uses DEFAULT_COST
        let hashed = bcrypt::hash("rahasia123", 4).unwrap();
        assert!(verify("rahasia123", &hashed));
        assert!(!verify("salah", &hashed));
    }

    #[test]
    fn test_verify_malformed_hash() {
        assert!(!verify("anything", "not-a-bcrypt-hash"));
    }
}
