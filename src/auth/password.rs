//! Argon2 password hashing

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use std::sync::OnceLock;

use crate::error::{ApiError, ApiResult};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> ApiResult<String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!("Password must be at least {} characters", MIN_PASSWORD_LEN)));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

/// `Ok(false)` on mismatch; an unparsable stored hash is an internal error.
pub fn verify_password(stored_hash: &str, provided: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| ApiError::Internal(format!("invalid stored password hash: {}", e)))?;
    match Argon2::default().verify_password(provided.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!("password verification failed: {}", e))),
    }
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Runs a full verification against a throwaway hash so an unknown account
/// costs the same as a wrong password. Always `false`.
pub fn verify_dummy(provided: &str) -> bool {
    let dummy = DUMMY_HASH.get_or_init(|| hash_password("storefront-unknown-account").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(hash, provided);
    }
    false
}
