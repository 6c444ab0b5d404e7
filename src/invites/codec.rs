//! Token codec - segreti casuali e relativi hash SHA-256
//!
//! Raw secrets leave this module only to be handed to the end user. Stores
//! keep the hex digest, and a presented value is checked by hashing it again.

use lazy_static::lazy_static;
use rand::{Rng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Random bytes behind every bearer secret (hex encoded: 64 chars)
pub const SECRET_BYTES: usize = 32;

/// Shortest raw invite token accepted before even looking it up
pub const MIN_TOKEN_LEN: usize = 32;

pub const OTP_LEN: usize = 6;

lazy_static! {
    static ref OTP_CODE: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
}

/// A freshly generated secret together with its lookup hash.
#[derive(Debug, Clone)]
pub struct Secret {
    pub raw: String,
    pub hash: String,
}

/// New high-entropy bearer secret (invite token, verification token)
pub fn generate_secret() -> Secret {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let raw = hex::encode(bytes);
    let hash = hash_secret(&raw);
    Secret { raw, hash }
}

/// New 6 digit code in [100000, 999999]
pub fn generate_otp() -> Secret {
    let code: u32 = rand::rng().random_range(100_000..=999_999);
    let raw = code.to_string();
    let hash = hash_secret(&raw);
    Secret { raw, hash }
}

pub fn hash_secret(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Hashes `presented` and compares it with a stored digest
pub fn matches(presented: &str, stored_hash: &str) -> bool {
    hash_secret(presented) == stored_hash
}

pub fn is_well_formed_token(raw: &str) -> bool {
    raw.len() >= MIN_TOKEN_LEN
}

pub fn is_well_formed_code(code: &str) -> bool {
    OTP_CODE.is_match(code)
}
