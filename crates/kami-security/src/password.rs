//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use kami_shared::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Hash error: {0}")]
    HashError(String),
    #[error("Password too short")]
    TooShort,
    #[error("Password too long")]
    TooLong,
}

pub struct PasswordService;

impl PasswordService {
    pub fn hash(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    pub fn verify(password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| PasswordError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    pub fn check_length(password: &str) -> Result<(), PasswordError> {
        let len = password.chars().count();
        if len < MIN_PASSWORD_LENGTH {
            return Err(PasswordError::TooShort);
        }
        if len > MAX_PASSWORD_LENGTH {
            return Err(PasswordError::TooLong);
        }
        Ok(())
    }
}
