//! Password hashing
//!
//! Argon2id with the crate defaults and a fresh random salt per hash. The
//! PHC string format keeps the parameters inside the stored hash, so the
//! cost settings can change later without invalidating existing accounts.

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password for storage. Output is a PHC string
/// (`$argon2id$v=19$...`).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash.
///
/// A wrong password is `Ok(false)`; a hash that does not parse is an error,
/// since that means the stored value is corrupt rather than mismatched.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("stored hash is not valid PHC: {e}"))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("password verification failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_argon2id_phc_string() {
        let hash = hash_password("correct horse battery staple").expect("hash");
        assert!(hash.starts_with("$argon2id$v=19$"));
    }

    #[test]
    fn salting_makes_hashes_unique() {
        let first = hash_password("repeat").expect("hash");
        let second = hash_password("repeat").expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn roundtrip_accepts_the_right_password() {
        let hash = hash_password("dawan-editor-2024").expect("hash");
        assert!(verify_password("dawan-editor-2024", &hash).expect("verify"));
        assert!(!verify_password("dawan-editor-2025", &hash).expect("verify"));
    }

    #[test]
    fn corrupt_stored_hash_is_an_error_not_a_mismatch() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(result.is_err());
    }

    #[test]
    fn non_ascii_passwords_roundtrip() {
        let password = "furaha-ya-Soomaaliya-🔑";
        let hash = hash_password(password).expect("hash");
        assert!(verify_password(password, &hash).expect("verify"));
    }

    #[test]
    fn empty_password_still_hashes_and_verifies() {
        // Length policy lives in the user service; the primitive stays total
        let hash = hash_password("").expect("hash");
        assert!(verify_password("", &hash).expect("verify"));
        assert!(!verify_password("x", &hash).expect("verify"));
    }
}
