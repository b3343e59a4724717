//! Credential generation and comparison.
//!
//! Every identifier is URL-safe base64 of bytes drawn from the operating
//! system CSPRNG. Session and file ids carry a prefix so that the two kinds of
//! id can never be confused when they show up in logs or URLs.

use rand::RngCore;

/// Prefix of session identifiers.
pub const SESSION_ID_PREFIX: &str = "sess_";

/// Prefix of WOPI file identifiers.
pub const FILE_ID_PREFIX: &str = "file_";

const ID_BYTES: usize = 16;
const SECRET_BYTES: usize = 32;

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    base64_url::encode(&bytes)
}

/// Generates a new session identifier.
#[must_use]
pub fn generate_session_id() -> String {
    format!("{SESSION_ID_PREFIX}{}", random_token(ID_BYTES))
}

/// Generates a new WOPI file identifier.
#[must_use]
pub fn generate_file_id() -> String {
    format!("{FILE_ID_PREFIX}{}", random_token(ID_BYTES))
}

/// Generates a WOPI access token.
#[must_use]
pub fn generate_access_token() -> String {
    random_token(SECRET_BYTES)
}

/// Generates a tenant API key.
#[must_use]
pub fn generate_api_key() -> String {
    random_token(SECRET_BYTES)
}

/// Compares two secrets in time that depends only on their lengths.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
