//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Generates the code verifier and S256 challenge used during the OAuth
//! authorization flow. The verifier stays with the client (in the state
//! ledger) and is sent during token exchange; the challenge travels in the
//! authorization URL so the server can verify the exchange request came
//! from the party that initiated the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Unreserved URL-safe characters permitted in a code verifier (RFC 7636 §4.1).
const CHARSET: &[u8; 66] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Minimum verifier length allowed by RFC 7636.
pub const MIN_VERIFIER_LENGTH: usize = 43;
/// Maximum verifier length allowed by RFC 7636.
pub const MAX_VERIFIER_LENGTH: usize = 128;
/// Verifier length used when the caller has no preference.
pub const DEFAULT_VERIFIER_LENGTH: usize = 64;

/// Generate a cryptographically random PKCE code verifier of `length`
/// characters from the unreserved charset.
///
/// `length` must lie in 43..=128; out-of-range lengths fail with
/// `InvalidParameter` before any randomness is consumed. Each random byte
/// is reduced modulo the 66-symbol charset, which leaves a small bounded
/// modulo bias. That costs a fraction of a bit of entropy per character
/// and is acceptable here.
pub fn generate_code_verifier(length: usize) -> Result<String> {
    if !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&length) {
        return Err(Error::InvalidParameter(format!(
            "code verifier length must be between {MIN_VERIFIER_LENGTH} and {MAX_VERIFIER_LENGTH}, got {length}"
        )));
    }
    Ok(random_from_charset(length))
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`, no padding. Deterministic
/// pure function of its input.
pub fn generate_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Generate an opaque anti-CSRF state token.
///
/// Shares the verifier alphabet and minimum length, but carries no PKCE
/// meaning: it is round-tripped through the authorization redirect to prove
/// the callback corresponds to a request this client issued.
pub fn generate_state() -> String {
    random_from_charset(MIN_VERIFIER_LENGTH)
}

fn random_from_charset(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::rng().fill(bytes.as_mut_slice());
    bytes
        .iter()
        .map(|b| CHARSET[*b as usize % CHARSET.len()] as char)
        .collect()
}
