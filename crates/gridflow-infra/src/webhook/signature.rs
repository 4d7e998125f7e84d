//! HMAC-SHA256 webhook payload signing and verification.
//!
//! Every outbound delivery carries a hex-encoded HMAC-SHA256 signature over
//! the exact serialized body. Receivers verify in constant time; a
//! `sha256=` prefix on the presented signature is accepted.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from signing or verification.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Signature verification failed.
    #[error("signature verification failed")]
    VerificationFailed,

    /// Invalid HMAC key.
    #[error("invalid HMAC key: {0}")]
    InvalidKey(String),
}

// ---------------------------------------------------------------------------
// Signing and verification
// ---------------------------------------------------------------------------

/// Sign a payload with HMAC-SHA256 and return the lowercase hex signature.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(payload);
    Ok(hex_encode(&mac.finalize().into_bytes()))
}

/// Verify a hex HMAC-SHA256 signature against a payload.
///
/// Constant-time via the hmac crate's `verify_slice`. Accepts a plain hex
/// signature or one carrying a `sha256=` prefix.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    signature: &str,
) -> Result<(), SignatureError> {
    let hex_sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    let expected_bytes =
        hex_decode(hex_sig).map_err(|_| SignatureError::VerificationFailed)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(payload);
    mac.verify_slice(&expected_bytes)
        .map_err(|_| SignatureError::VerificationFailed)
}

// ---------------------------------------------------------------------------
// Secret generation
// ---------------------------------------------------------------------------

/// Generate a fresh webhook signing secret: `whsec_` + 32 hex chars.
///
/// Entropy comes from two UUIDv7s run through SHA-256.
pub fn generate_secret() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::now_v7().as_bytes());
    hasher.update(Uuid::now_v7().as_bytes());
    let digest = hasher.finalize();
    format!("whsec_{}", hex_encode(&digest[..16]))
}

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

/// Encode bytes to a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a hex string to bytes.
///
/// Input comes straight from a request header, so anything non-ASCII is
/// rejected before the byte-offset slicing below.
fn hex_decode(hex: &str) -> Result<Vec<u8>, ()> {
    if !hex.is_ascii() || hex.len() % 2 != 0 {
        return Err(());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
