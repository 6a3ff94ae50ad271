//! Password hashing for the seeded admin account.
//!
//! Stored values are Argon2 PHC strings (`$argon2id$v=19$...`), so the
//! parameters travel with the hash and older rows keep verifying.

use argon2::{
    Argon2,
    password_hash::{
        Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};

use crate::error::AppError;

fn hash_error(context: &str, e: HashError) -> AppError {
    AppError::Internal(format!("{}: {}", context, e))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| hash_error("hashing password", e))
}

/// `Ok(false)` only for a mismatch. A stored value that is not a usable
/// PHC string is an `Internal` error, so a corrupt row is not mistaken for a
/// changed password.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored).map_err(|e| hash_error("parsing stored hash", e))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(hash_error("verifying password", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_against_their_password_only() {
        let hash = hash_password("s3cret-admin").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-admin", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn each_hash_gets_its_own_salt() {
        let first = hash_password("same").unwrap();
        let second = hash_password("same").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("same", &first).unwrap());
        assert!(verify_password("same", &second).unwrap());
    }

    #[test]
    fn unusable_stored_hash_is_internal_not_a_mismatch() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(AppError::Internal(_))
        ));
        assert!(matches!(verify_password("x", ""), Err(AppError::Internal(_))));
    }
}
