//! Credential hashing and verification using Argon2
//!
//! Secrets are stored as PHC-formatted Argon2id hashes; plaintext never
//! reaches the durable store.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::StoreError;

/// Hash a secret with a fresh random salt.
///
/// Returns the PHC string embedding the salt and parameters.
pub fn hash_secret(secret: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Auth(format!("Failed to hash secret: {e}")))
}

/// Verify a claimed secret against a stored hash
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, StoreError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| StoreError::Auth(format!("Invalid credential hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}
