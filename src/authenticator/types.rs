//! Core types for the enrollment / TOTP authenticator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm used for HMAC-based OTP.
///
/// The verifying backend currently uses SHA-1; the stronger variants are
/// kept selectable for a coordinated upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Sha1
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "SHA1"),
            Self::Sha256 => write!(f, "SHA256"),
            Self::Sha512 => write!(f, "SHA512"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Secret
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shared TOTP secret in its stored base-32 textual form.
///
/// Immutable for the lifetime of an enrollment. `Debug` is redacted and the
/// type deliberately has no `Display`; the raw value is only reachable via
/// [`Secret::as_base32`] (persistence) and [`Secret::decode`] (HMAC keying).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap an already base-32 encoded secret (e.g. loaded from storage).
    pub fn from_base32(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The stored textual form, for handing to the persistence collaborator.
    pub fn as_base32(&self) -> &str {
        &self.0
    }

    /// Decode to raw key bytes. Fails with `InvalidSecret` if the result is
    /// empty, `DecodeError` on a bad alphabet.
    pub fn decode(&self) -> Result<Vec<u8>, AuthError> {
        crate::authenticator::secret::decode_secret(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} chars redacted>)", self.0.len())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Enrollment request
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A parsed `type == "auth"` QR payload. Discarded once the enrollment it
/// triggers completes or fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub user_id: String,
    pub account_id: String,
    pub user_name: String,
    /// Issue time of the QR payload, as sent by the backend (ISO-8601 text).
    pub timestamp: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Credential
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The single durable credential of this installation.
///
/// Created on successful enrollment, replaced wholesale on re-enrollment,
/// always persisted as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub secret: Secret,
    pub user_id: String,
    pub account_id: String,
    pub user_name: String,
    /// When the enrollment completed on this device.
    pub enrolled_at: DateTime<Utc>,
}

impl Credential {
    /// Bind a freshly generated secret to the identity from an enrollment
    /// request.
    pub fn new(secret: Secret, request: &EnrollmentRequest) -> Self {
        Self {
            secret,
            user_id: request.user_id.clone(),
            account_id: request.account_id.clone(),
            user_name: request.user_name.clone(),
            enrolled_at: Utc::now(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Code window
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A generated code with its timing info. Recomputed every rollover, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeWindow {
    /// The 6-digit code string (e.g. "123456").
    pub code: String,
    /// Start of the current window, epoch seconds rounded down to a
    /// period boundary.
    pub window_start: u64,
    /// Seconds until the window rolls over, in [1, period].
    pub seconds_remaining: u32,
    /// Window length in seconds (30 for the IOB backend).
    pub period: u32,
    /// Expiry fraction 0.0–1.0 (1.0 = about to roll over), for progress bars.
    pub progress: f64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthErrorKind {
    /// Scan text does not carry the `iob-auth://` scheme prefix.
    InvalidFormat,
    /// Base-64 envelope or base-32 secret failed to decode.
    DecodeError,
    /// JSON envelope is missing fields or has wrong-typed fields.
    MalformedPayload,
    /// Secret decodes to empty / degenerate key material.
    InvalidSecret,
    /// The persistence collaborator failed.
    StorageError,
    Internal,
}

/// Crate-level error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    pub fn new(kind: AuthErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<AuthError> for String {
    fn from(e: AuthError) -> String {
        e.to_string()
    }
}
