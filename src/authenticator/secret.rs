//! Secret codec — base-32 (RFC 4648) textual form of TOTP key material,
//! plus generation of fresh secrets.
//!
//! The backend's enrollment flow expects the secret in the unpadded
//! uppercase alphabet (A–Z, 2–7), 20 raw bytes (160 bits).

use rand::rngs::OsRng;
use rand::RngCore;

use crate::authenticator::types::{AuthError, AuthErrorKind, Secret};

/// Raw secret length in bytes. 160 bits, matching the backend's generator.
pub const SECRET_LEN: usize = 20;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Codec
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Encode raw key bytes to base-32 (no padding, uppercase).
pub fn encode_secret(bytes: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, bytes)
}

/// Decode a base-32 secret (with or without spaces/dashes, case-insensitive).
///
/// Characters outside the alphabet fail with `DecodeError`; key material
/// that decodes to zero bytes fails with `InvalidSecret`.
pub fn decode_secret(b32: &str) -> Result<Vec<u8>, AuthError> {
    let cleaned = b32.replace(' ', "").replace('-', "").to_uppercase();
    // Pad to multiple of 8 if needed
    let padded = pad_base32(&cleaned);
    let bytes = base32::decode(base32::Alphabet::Rfc4648 { padding: true }, &padded)
        .or_else(|| base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &cleaned))
        .ok_or_else(|| AuthError::new(AuthErrorKind::DecodeError, "Invalid base-32 secret"))?;
    if bytes.is_empty() {
        return Err(AuthError::new(
            AuthErrorKind::InvalidSecret,
            "Secret decodes to empty key material",
        ));
    }
    Ok(bytes)
}

/// Pad a base-32 string to a multiple of 8 with '='.
fn pad_base32(s: &str) -> String {
    let remainder = s.len() % 8;
    if remainder == 0 {
        s.to_string()
    } else {
        let pad_count = 8 - remainder;
        format!("{}{}", s, "=".repeat(pad_count))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate a fresh secret from the OS CSPRNG (never a general-purpose PRNG).
pub fn generate_secret() -> Secret {
    generate_secret_of_len(SECRET_LEN)
}

/// Generate a secret with an explicit raw byte length.
pub fn generate_secret_of_len(byte_length: usize) -> Secret {
    let mut buf = vec![0u8; byte_length];
    OsRng.fill_bytes(&mut buf);
    Secret::from_base32(encode_secret(&buf))
}
