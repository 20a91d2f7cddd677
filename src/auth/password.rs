use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use tracing::error;

pub const MIN_PASSWORD_LEN: usize = 8;

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

/// Lowercase, uppercase, digit and symbol, with at least [`MIN_PASSWORD_LEN`] chars.
pub fn check_password_strength(plain: &str) -> bool {
    lazy_static! {
        static ref LOWER_RE: Regex = Regex::new(r"[a-z]").unwrap();
        static ref UPPER_RE: Regex = Regex::new(r"[A-Z]").unwrap();
        static ref DIGIT_RE: Regex = Regex::new(r"[0-9]").unwrap();
        static ref SYMBOL_RE: Regex = Regex::new(r"[^A-Za-z0-9\s]").unwrap();
    }
    plain.chars().count() >= MIN_PASSWORD_LEN
        && LOWER_RE.is_match(plain)
        && UPPER_RE.is_match(plain)
        && DIGIT_RE.is_match(plain)
        && SYMBOL_RE.is_match(plain)
}
