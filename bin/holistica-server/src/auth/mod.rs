//! Authentication primitives: password hashing and the caller identity.
//!
//! Passwords are stored as Argon2id PHC strings. Login tokens are opaque
//! UUIDs handed to the client once; only their SHA-256 digest is kept in
//! the database (see [`crate::middleware::auth`]).

pub mod identity;
pub mod policy;

pub use identity::AuthIdentity;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

use crate::error::ServerError;

/// Hash `plain` with Argon2id and a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, ServerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServerError::Internal(format!("password hashing failed: {e}")))
}

/// Check `plain` against a stored PHC string.
///
/// A mismatch is reported as `Unauthorized` with the same message a
/// missing account gets, so login failures do not reveal which part was
/// wrong.
pub fn verify_password(plain: &str, stored_hash: &str) -> Result<(), ServerError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ServerError::Internal(format!("stored password hash is malformed: {e}")))?;
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .map_err(|_| ServerError::Unauthorized("email ou senha inválidos".to_owned()))
}
