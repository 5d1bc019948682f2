use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::error::UserError;

const MIN_PASSWORD_CHARS: usize = 8;

/// Hash a plaintext password with a fresh random salt.
///
/// The length rule lives here so every write path that stores a password
/// enforces it, whatever the caller validated.
pub fn hash_password(plain: &str) -> Result<String, UserError> {
    if plain.chars().count() < MIN_PASSWORD_CHARS {
        return Err(UserError::Validation(
            "Password must be at least 8 characters.".into(),
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            UserError::Store(anyhow::anyhow!(e.to_string()))
        })?
        .to_string();
    Ok(hash)
}

/// Check a plaintext password against a stored hash.
///
/// A stored hash that does not parse counts as a mismatch; callers cannot
/// tell corrupt data apart from a wrong password.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        warn!("stored password hash is malformed");
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn hashing_twice_yields_different_hashes() {
        let password = "correct-horse-battery-staple";
        let first = hash_password(password).expect("hashing should succeed");
        let second = hash_password(password).expect("hashing should succeed");
        assert_ne!(first, second);
        assert!(verify_password(password, &first));
        assert!(verify_password(password, &second));
    }

    #[test]
    fn short_password_is_rejected_before_hashing() {
        let err = hash_password("short7!").unwrap_err();
        match err {
            UserError::Validation(message) => {
                assert_eq!(message, "Password must be at least 8 characters.");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn exactly_eight_characters_is_accepted() {
        assert!(hash_password("eightch8").is_ok());
    }

    #[test]
    fn malformed_hash_verifies_as_mismatch() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
    }
}
