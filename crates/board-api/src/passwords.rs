use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::error;

use crate::error::ApiError;

/// Argon2id with a fresh salt. CPU-heavy; call from a blocking thread.
pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal
        })
}

pub fn verify_password(plain: &str, stored: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!("Stored password hash is malformed: {}", e);
        ApiError::Internal
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Mutations answer a wrong password with 403.
pub fn require_password(plain: &str, stored: &str) -> Result<(), ApiError> {
    if verify_password(plain, stored)? {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_its_password() {
        let hash = hash_password("trailhead").unwrap();
        assert_ne!(hash, "trailhead");
        assert!(verify_password("trailhead", &hash).unwrap());
        assert!(!verify_password("trailhead!", &hash).unwrap());
        assert!(matches!(
            require_password("wrong", &hash),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn malformed_hash_is_internal() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(ApiError::Internal)
        ));
    }
}
