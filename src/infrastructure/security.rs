// Credential handling - password hashes and password-reset tokens

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Reset links stay valid for one hour.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Hash a password with Argon2id, returning the PHC string (salt included).
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn validate_new_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// 32 random bytes, hex encoded.
pub fn generate_reset_token(now: DateTime<Utc>) -> ResetToken {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    ResetToken {
        token: hex::encode(bytes),
        expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse", &hash).unwrap());
        assert!(!verify_password("wrong-horse", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_hash_is_an_error() {
        assert!(verify_password("pw", "not-a-hash").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_new_password("12345").is_err());
        assert!(validate_new_password("123456").is_ok());
    }

    #[test]
    fn test_reset_token_shape() {
        let now = Utc::now();
        let reset = generate_reset_token(now);
        assert_eq!(reset.token.len(), 64);
        assert!(reset.token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(reset.expires_at - now, Duration::minutes(60));
        assert_ne!(generate_reset_token(now).token, reset.token);
    }
}
