//! Enrollment payload parsing.
//!
//! The banking site renders a QR code containing
//! `iob-auth://` + base64(utf8(json)), where the JSON envelope is
//! `{"userId", "accountId", "userName", "timestamp", "type"}`.
//! Only `type == "auth"` triggers enrollment; other types are valid scans
//! that the caller must ignore, not reject.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use serde::Deserialize;

use crate::authenticator::types::{AuthError, AuthErrorKind, EnrollmentRequest};

/// Scheme prefix of enrollment QR payloads.
pub const SCHEME_PREFIX: &str = "iob-auth://";

/// Payload `type` value that triggers enrollment.
pub const AUTH_TYPE: &str = "auth";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Wire envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// JSON envelope as carried inside the QR payload. All five fields are
/// required strings; anything else is a malformed payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    user_id: String,
    account_id: String,
    user_name: String,
    timestamp: String,
    #[serde(rename = "type")]
    payload_type: String,
}

/// Outcome of parsing a scanned QR string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedScan {
    /// A `type == "auth"` payload; the caller should enroll.
    Enrollment(EnrollmentRequest),
    /// A structurally valid payload of another type; the caller should
    /// ignore the scan.
    Ignored { payload_type: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse a scanned QR string into a [`ParsedScan`]. Pure; no side effects.
pub fn parse_scan(qr_text: &str) -> Result<ParsedScan, AuthError> {
    let encoded = qr_text.trim().strip_prefix(SCHEME_PREFIX).ok_or_else(|| {
        AuthError::new(
            AuthErrorKind::InvalidFormat,
            format!("Expected scheme prefix '{}'", SCHEME_PREFIX),
        )
    })?;

    // btoa pads its output, but accept an unpadded envelope too.
    let raw = STANDARD
        .decode(encoded)
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        .map_err(|e| {
            AuthError::new(AuthErrorKind::DecodeError, "Payload is not valid base-64")
                .with_detail(e.to_string())
        })?;

    let json = String::from_utf8(raw).map_err(|e| {
        AuthError::new(AuthErrorKind::DecodeError, "Payload is not valid UTF-8")
            .with_detail(e.to_string())
    })?;

    let envelope: WireEnvelope = serde_json::from_str(&json).map_err(|e| {
        AuthError::new(AuthErrorKind::MalformedPayload, "Envelope shape violation")
            .with_detail(e.to_string())
    })?;

    if envelope.payload_type != AUTH_TYPE {
        log::debug!("ignoring scan of type '{}'", envelope.payload_type);
        return Ok(ParsedScan::Ignored {
            payload_type: envelope.payload_type,
        });
    }

    Ok(ParsedScan::Enrollment(EnrollmentRequest {
        user_id: envelope.user_id,
        account_id: envelope.account_id,
        user_name: envelope.user_name,
        timestamp: envelope.timestamp,
    }))
}
