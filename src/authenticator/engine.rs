//! Code generation — RFC 4226 (HOTP) truncation driven by the RFC 6238
//! time-step, as verified by the banking backend (SHA-1, 6 digits, 30 s).
//!
//! Everything here is a pure function of `(secret, now)`; the wall clock is
//! read by the countdown scheduler, never in this module.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::authenticator::types::{Algorithm, AuthError, CodeWindow, Secret};

/// Code length the backend verifies.
pub const DIGITS: u8 = 6;

/// Window length in seconds.
pub const PERIOD: u32 = 30;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw HMAC-OTP (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute an HOTP code for the given raw key bytes and counter.
pub fn hotp_raw(key: &[u8], counter: u64, digits: u8, algo: Algorithm) -> String {
    let hmac_result = compute_hmac(key, &counter.to_be_bytes(), algo);
    truncate(&hmac_result, digits)
}

/// Compute HMAC(key, message) using the specified algorithm.
fn compute_hmac(key: &[u8], data: &[u8], algo: Algorithm) -> Vec<u8> {
    match algo {
        Algorithm::Sha1 => {
            let mut mac =
                Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha256 => {
            let mut mac =
                Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha512 => {
            let mut mac =
                Hmac::<Sha512>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Dynamic truncation per RFC 4226 §5.3: 4-byte big-endian slice at the
/// offset named by the low nibble of the last byte, high bit masked,
/// reduced modulo 10^digits, left-zero-padded.
fn truncate(hmac_result: &[u8], digits: u8) -> String {
    let offset = (hmac_result[hmac_result.len() - 1] & 0x0f) as usize;
    let binary = ((hmac_result[offset] as u32 & 0x7f) << 24)
        | ((hmac_result[offset + 1] as u32) << 16)
        | ((hmac_result[offset + 2] as u32) << 8)
        | (hmac_result[offset + 3] as u32);
    let modulus = 10u32.pow(digits as u32);
    let code = binary % modulus;
    format!("{:0>width$}", code, width = digits as usize)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Time-step helpers (RFC 6238)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the time-step counter for a given unix timestamp.
pub fn time_step_at(unix_seconds: u64, period: u32) -> u64 {
    unix_seconds / period as u64
}

/// Start of the window containing `unix_seconds`, rounded down to a
/// period boundary.
pub fn window_start_at(unix_seconds: u64, period: u32) -> u64 {
    time_step_at(unix_seconds, period) * period as u64
}

/// Seconds remaining before the window containing `unix_seconds` rolls
/// over, in [1, period].
pub fn seconds_remaining_at(unix_seconds: u64, period: u32) -> u32 {
    let p = period as u64;
    (p - (unix_seconds % p)) as u32
}

/// Progress fraction (0.0 = fresh code, 1.0 = about to expire).
pub fn progress_fraction_at(unix_seconds: u64, period: u32) -> f64 {
    let elapsed = (unix_seconds % period as u64) as f64;
    elapsed / period as f64
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Code generation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate a code with explicit parameters, at a unix timestamp.
pub fn generate_with_at(
    secret: &Secret,
    digits: u8,
    period: u32,
    algo: Algorithm,
    unix_seconds: u64,
) -> Result<String, AuthError> {
    let key = secret.decode()?;
    let step = time_step_at(unix_seconds, period);
    Ok(hotp_raw(&key, step, digits, algo))
}

/// Generate the 6-digit backend code at a unix timestamp.
pub fn generate_code_at(secret: &Secret, unix_seconds: u64) -> Result<String, AuthError> {
    generate_with_at(secret, DIGITS, PERIOD, Algorithm::default(), unix_seconds)
}

/// Generate the full [`CodeWindow`] (code + timing) at a unix timestamp.
pub fn code_window_at(secret: &Secret, unix_seconds: u64) -> Result<CodeWindow, AuthError> {
    let code = generate_code_at(secret, unix_seconds)?;
    Ok(CodeWindow {
        code,
        window_start: window_start_at(unix_seconds, PERIOD),
        seconds_remaining: seconds_remaining_at(unix_seconds, PERIOD),
        period: PERIOD,
        progress: progress_fraction_at(unix_seconds, PERIOD),
    })
}
