use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

use crate::errors::{ErrorKind, StrataError, StrataResult};

/// Hashes a plain password with Argon2 and a fresh random salt.
///
/// The returned PHC string embeds the salt and parameters, so it is all
/// `verify_password` needs later.
pub fn hash_password(password: &str) -> StrataResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(e) => {
            log::error!("Failed to hash password: {:?}", e);
            Err(StrataError::new(
                "Failed to hash password",
                ErrorKind::SecurityError,
            ))
        }
    }
}

/// Checks a plain password against a stored Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> StrataResult<bool> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::error!("Stored password hash is malformed: {:?}", e);
            return Err(StrataError::new(
                "Stored password hash is malformed",
                ErrorKind::SecurityError,
            ));
        }
    };

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// True when `value` already looks like a PHC-formatted Argon2 hash.
pub(crate) fn is_password_hash(value: &str) -> bool {
    value.starts_with("$argon2") && PasswordHash::new(value).is_ok()
}
