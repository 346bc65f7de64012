use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

pub const MIN_PASSWORD_LEN: usize = 12;
const PASSWORD_SPECIALS: &str = "!@#$%^&+=.";

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Minimum length, at least one digit, lower, upper and special character, no whitespace.
pub fn is_strong_password(plain: &str) -> bool {
    plain.chars().count() >= MIN_PASSWORD_LEN
        && !plain.chars().any(char::is_whitespace)
        && plain.chars().any(|c| c.is_ascii_digit())
        && plain.chars().any(|c| c.is_ascii_lowercase())
        && plain.chars().any(|c| c.is_ascii_uppercase())
        && plain.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}
