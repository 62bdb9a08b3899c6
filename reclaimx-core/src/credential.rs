//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant with default parameters. Stored values are PHC
//! strings carrying their own salt and parameters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Hash checked against when there is no real one to check.
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Credential(format!("failed to hash password: {e}")))
}

/// Verify a password against a stored hash
///
/// The underlying comparison is constant-time. A stored value that is not a
/// PHC string never matches, and still costs one full verification.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored credential is not a valid password hash");
            verify_dummy(password);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Burns the same work as a real verification.
///
/// Called when the phone number is unknown so response time does not reveal
/// whether an account exists.
pub(crate) fn verify_dummy(password: &str) {
    let dummy = DUMMY_HASH.get_or_init(|| hash_password("reclaimx-dummy-credential").ok());
    if let Some(parsed) = dummy.as_deref().and_then(|hash| PasswordHash::new(hash).ok()) {
        let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
    }
}
