use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use regex::Regex;

use crate::error::{ApiRequestError, AppError};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_EMAIL_LENGTH: usize = 254;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]{3,20}$").expect("username regex is valid"));

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AccountValidationError {
    #[error("Invalid email")]
    InvalidEmail,

    #[error("Username must be 3 to 20 characters of lowercase letters, digits or underscores")]
    InvalidUsername,

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    #[error("Password must be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,
}

impl ApiRequestError for AccountValidationError {}

pub fn normalize_email(email: &str) -> Result<String, AccountValidationError> {
    let email = email.trim().to_lowercase();

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(AccountValidationError::InvalidEmail);
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AccountValidationError::InvalidEmail),
    }
}

pub fn normalize_username(username: &str) -> Result<String, AccountValidationError> {
    let username = username.trim().to_lowercase();

    if !USERNAME_RE.is_match(&username) {
        return Err(AccountValidationError::InvalidUsername);
    }

    Ok(username)
}

pub fn validate_password(password: &str) -> Result<(), AccountValidationError> {
    let len = password.chars().count();

    if len < MIN_PASSWORD_LENGTH {
        return Err(AccountValidationError::PasswordTooShort);
    }

    if len > MAX_PASSWORD_LENGTH {
        return Err(AccountValidationError::PasswordTooLong);
    }

    Ok(())
}

fn hash_blocking(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| format!("Failed to hash password: {e}"))
}

fn verify_blocking(password: &str, hash: &str) -> Result<bool, String> {
    let parsed = PasswordHash::new(hash).map_err(|e| format!("Stored password hash is invalid: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Hashing is deliberately slow, keep it off the async workers
pub async fn hash_password(password: String) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| format!("Password hashing task failed: {e}"))??;
    Ok(hash)
}

static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_blocking("no account has this password").ok());

/// Without a stored hash the password is checked against a dummy one and the
/// result is always `false`, so unknown accounts cost as much as wrong
/// passwords.
pub async fn verify_password(password: String, hash: Option<String>) -> Result<bool, AppError> {
    let matches = tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_blocking(&password, &hash),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_blocking(&password, dummy);
            }
            Ok(false)
        }
    })
    .await
    .map_err(|e| format!("Password verification task failed: {e}"))??;
    Ok(matches)
}
