//! High-level orchestrator — owns the credential store, wires the scan →
//! enroll → countdown → display flow together.
//!
//! The UI shell holds this behind [`AuthenticatorState`] and calls in from
//! its scan-result and lifecycle callbacks; everything here is recoverable,
//! nothing aborts the process.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::authenticator::countdown::{CountdownScheduler, SystemClock, Clock};
use crate::authenticator::engine;
use crate::authenticator::payload::{self, ParsedScan};
use crate::authenticator::secret;
use crate::authenticator::store::{CredentialStore, KeyValueStore};
use crate::authenticator::types::{AuthError, CodeWindow, Credential};

/// Thread-safe service state for the UI shell.
pub type AuthenticatorState<S> = Arc<Mutex<AuthenticatorService<S>>>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Display boundary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The rendering collaborator. Receives the code/countdown once per tick
/// and the account identity once per successful enrollment.
pub trait DisplaySink: Send + Sync {
    fn code_updated(&self, window: &CodeWindow);
    fn enrolled(&self, user_name: &str, account_id: &str);
    /// User-facing message for recovered errors ("Invalid QR code format").
    fn message(&self, text: &str);
}

/// Outcome of processing one scanned QR string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A credential was created and persisted.
    Enrolled {
        user_name: String,
        account_id: String,
    },
    /// Structurally valid scan of a non-"auth" type; nothing changed.
    Ignored { payload_type: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Central authenticator service.
pub struct AuthenticatorService<S: KeyValueStore> {
    store: CredentialStore<S>,
}

impl<S: KeyValueStore> AuthenticatorService<S> {
    pub fn new(kv: S) -> Self {
        Self {
            store: CredentialStore::new(kv),
        }
    }

    /// Wrap in `Arc<Mutex<_>>` for the UI shell.
    pub fn into_state(self) -> AuthenticatorState<S> {
        Arc::new(Mutex::new(self))
    }

    // ── Enrollment ───────────────────────────────────────────────

    /// Process a scanned QR string: parse the payload, derive a fresh
    /// secret, persist the credential. A non-"auth" payload is a no-op.
    pub fn handle_scan(&mut self, qr_text: &str) -> Result<ScanOutcome, AuthError> {
        match payload::parse_scan(qr_text)? {
            ParsedScan::Ignored { payload_type } => Ok(ScanOutcome::Ignored { payload_type }),
            ParsedScan::Enrollment(request) => {
                let secret = secret::generate_secret();
                let credential = Credential::new(secret, &request);
                self.store.save(&credential)?;
                log::info!(
                    "enrolled user {} (account {})",
                    credential.user_id,
                    credential.account_id
                );
                Ok(ScanOutcome::Enrolled {
                    user_name: credential.user_name,
                    account_id: credential.account_id,
                })
            }
        }
    }

    /// [`handle_scan`](Self::handle_scan) with errors recovered at this
    /// boundary and surfaced to the display, the way the scan-result
    /// callback consumes it. Returns `true` if an enrollment happened.
    pub fn process_scan(&mut self, qr_text: &str, display: &dyn DisplaySink) -> bool {
        match self.handle_scan(qr_text) {
            Ok(ScanOutcome::Enrolled {
                user_name,
                account_id,
            }) => {
                display.enrolled(&user_name, &account_id);
                true
            }
            Ok(ScanOutcome::Ignored { payload_type }) => {
                log::debug!("scan of type '{}' ignored", payload_type);
                false
            }
            Err(e) => {
                log::warn!("scan rejected: {}", e);
                display.message(&format!("Error processing QR code: {}", e.message));
                false
            }
        }
    }

    // ── Credential queries ───────────────────────────────────────

    /// Presence of a stored credential is the only enrollment test.
    pub fn is_enrolled(&self) -> Result<bool, AuthError> {
        Ok(self.store.load()?.is_some())
    }

    /// `(user_name, account_id)` of the enrolled account, if any.
    pub fn account_info(&self) -> Result<Option<(String, String)>, AuthError> {
        Ok(self
            .store
            .load()?
            .map(|c| (c.user_name, c.account_id)))
    }

    /// Drop the enrollment (the credential is replaced wholesale anyway on
    /// the next successful scan).
    pub fn clear_enrollment(&mut self) -> Result<(), AuthError> {
        self.store.clear()
    }

    // ── Code generation ──────────────────────────────────────────

    /// Compute the current [`CodeWindow`] at an explicit timestamp.
    /// `None` while not enrolled.
    pub fn current_window_at(&self, now: u64) -> Result<Option<CodeWindow>, AuthError> {
        match self.store.load()? {
            None => Ok(None),
            Some(credential) => engine::code_window_at(&credential.secret, now).map(Some),
        }
    }

    /// Compute the current [`CodeWindow`] from the wall clock (the manual
    /// refresh path).
    pub fn current_window(&self) -> Result<Option<CodeWindow>, AuthError> {
        self.current_window_at(SystemClock.now_unix())
    }

    // ── Countdown wiring ─────────────────────────────────────────

    /// Start pushing `{code, seconds_remaining}` to the display once per
    /// second, regenerating the code exactly once per window rollover.
    ///
    /// Snapshots the enrolled secret; re-enrollment restarts the ticker (the
    /// UI switches views, stopping this one first). Returns `false` without
    /// starting when not enrolled or the scheduler is already running.
    pub fn start_code_ticker(
        &self,
        scheduler: &mut CountdownScheduler,
        display: Arc<dyn DisplaySink>,
    ) -> Result<bool, AuthError> {
        let credential = match self.store.load()? {
            Some(c) => c,
            None => return Ok(false),
        };
        let secret = credential.secret;

        let mut current: Option<CodeWindow> = None;
        let started = scheduler.start(move |tick| {
            let regenerate = tick.rolled_over || current.is_none();
            if regenerate {
                match engine::code_window_at(&secret, tick.now) {
                    Ok(window) => current = Some(window),
                    Err(e) => {
                        log::warn!("code generation failed: {}", e);
                        display.message(&format!("Code generation failed: {}", e.message));
                        return;
                    }
                }
            }
            if let Some(window) = current.as_mut() {
                if !regenerate {
                    // same code, fresher countdown
                    window.seconds_remaining = tick.seconds_remaining;
                    window.progress = engine::progress_fraction_at(tick.now, window.period);
                }
                display.code_updated(window);
            }
        });

        Ok(started.is_some())
    }
}
