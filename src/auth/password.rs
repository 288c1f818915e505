use anyhow::Context;
use base64ct::{Base64, Encoding};
use lazy_static::lazy_static;
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::Sha256;
use tracing::error;

/// PBKDF2 rounds. Changing this invalidates every stored hash.
pub const KDF_ITERATIONS: u32 = 10_000;
/// Length in bytes of the derived key (hex-encoded to twice as many chars).
pub const HASH_LEN: usize = 64;
/// Random bytes drawn for each salt before base64 encoding.
pub const SALT_LEN: usize = 128;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Derived credential material stored next to a user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword {
    pub hash: String,
    pub salt: String,
}

/// Password policy: one line of at least eight characters holding a lowercase
/// letter and a digit. Missing input never passes.
pub fn is_valid_password_format<'a>(password: impl Into<Option<&'a str>>) -> bool {
    lazy_static! {
        static ref SINGLE_LINE_RE: Regex = Regex::new(r"^[^\n\r\u{2028}\u{2029}]+$").unwrap();
        static ref LOWER_RE: Regex = Regex::new(r"[a-z]").unwrap();
        static ref DIGIT_RE: Regex = Regex::new(r"[0-9]").unwrap();
    }
    let Some(password) = password.into() else {
        return false;
    };
    password.chars().count() >= MIN_PASSWORD_LEN
        && SINGLE_LINE_RE.is_match(password)
        && LOWER_RE.is_match(password)
        && DIGIT_RE.is_match(password)
}

/// Hashes `plain` under a freshly generated salt.
///
/// CPU-bound: async callers should run it on the blocking pool.
pub fn hash_password(plain: &str) -> anyhow::Result<HashedPassword> {
    let salt = generate_salt()?;
    let hash = derive(plain, &salt);
    Ok(HashedPassword { hash, salt })
}

/// Re-derives the digest of `candidate` under `salt` and compares it with `hash`.
pub fn verify_password(candidate: &str, hash: &str, salt: &str) -> bool {
    let derived = derive(candidate, salt);
    constant_time_eq(derived.as_bytes(), hash.as_bytes())
}

fn generate_salt() -> anyhow::Result<String> {
    let mut bytes = [0u8; SALT_LEN];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        error!(error = %e, "os rng unavailable");
        return Err(e).context("generate password salt");
    }
    Ok(Base64::encode_string(&bytes))
}

fn derive(plain: &str, salt: &str) -> String {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(plain.as_bytes(), salt.as_bytes(), KDF_ITERATIONS, &mut out);
    hex::encode(out)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
