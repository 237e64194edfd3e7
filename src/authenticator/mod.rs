//! Authenticator crate: sub-modules.

pub mod types;
pub mod secret;
pub mod payload;
pub mod engine;
pub mod store;
pub mod countdown;
pub mod service;

// Re-export top-level items for convenience.
pub use types::*;
pub use payload::{parse_scan, ParsedScan};
pub use store::{CredentialStore, KeyValueStore, MemoryStore};
pub use countdown::{Countdown, CountdownScheduler, Clock, SystemClock, Tick};
pub use service::{AuthenticatorService, AuthenticatorState, DisplaySink, ScanOutcome};
