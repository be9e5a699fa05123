//! Password hashing. One-way, salted, constant-time verify.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

/// Hash a password into a PHC-format string for storage.
///
/// # Errors
///
/// Returns an error if hashing fails (bad parameters or RNG failure).
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Verify a candidate password against a stored PHC hash.
///
/// An unparseable stored hash counts as a failed verification rather than an
/// error; the login path treats both the same way.
pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_accepts_the_password() -> Result<()> {
        let hash = hash_password("admin123")?;
        assert!(verify_password("admin123", &hash));
        Ok(())
    }

    #[test]
    fn verify_rejects_wrong_password() -> Result<()> {
        let hash = hash_password("admin123")?;
        assert!(!verify_password("admin124", &hash));
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash_password("admin123")?;
        let second = hash_password("admin123")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn malformed_stored_hash_fails_verification() {
        assert!(!verify_password("admin123", "not-a-phc-hash"));
    }
}
