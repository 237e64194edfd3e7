//! # IOB Authenticator – Enrollment & TOTP Core
//!
//! Device-side core of the IOB banking authenticator:
//!
//! - **Enrollment** – Parse `iob-auth://` QR payloads (base64 JSON envelope)
//!   into enrollment requests, derive a fresh shared secret, persist the
//!   resulting credential
//! - **RFC 4226 / 6238** – HOTP & TOTP generation with SHA-1, SHA-256, SHA-512
//! - **Countdown** – 1 Hz scheduler that tracks the 30-second code window and
//!   signals rollover exactly once per window
//! - **Storage** – Credential persistence over an injected key-value
//!   capability (atomic replace, single credential per installation)
//!
//! Camera capture, QR image decoding and screen rendering are external
//! collaborators; this crate only consumes the decoded scan string and pushes
//! `{code, seconds_remaining}` updates to a display sink.

pub mod authenticator;
