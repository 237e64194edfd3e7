//! Credential persistence over an injected key-value capability.
//!
//! The device's durable store (SharedPreferences-alike) is an external
//! collaborator; the core only needs string get plus an atomic batch write.
//! Absence of a stored credential means "not enrolled" — presence is never
//! interpreted beyond that.

use chrono::{DateTime, Utc};

use crate::authenticator::types::{AuthError, Credential, Secret};

/// Storage keys, shared with the device persistence layer.
pub const KEY_SECRET: &str = "totp_secret";
pub const KEY_USER_ID: &str = "user_id";
pub const KEY_ACCOUNT_ID: &str = "account_id";
pub const KEY_USER_NAME: &str = "user_name";
pub const KEY_ENROLLED_AT: &str = "enrolled_at";

const ALL_KEYS: [&str; 5] = [
    KEY_SECRET,
    KEY_USER_ID,
    KEY_ACCOUNT_ID,
    KEY_USER_NAME,
    KEY_ENROLLED_AT,
];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Key-value capability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// String-keyed store supplied by the platform. Writes are durable across
/// process restarts; a batch is applied atomically.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError>;

    /// Apply all pairs as one atomic replace.
    fn put_many(&mut self, pairs: &[(&str, &str)]) -> Result<(), AuthError>;

    /// Remove all given keys as one atomic operation.
    fn remove_many(&mut self, keys: &[&str]) -> Result<(), AuthError>;
}

/// In-memory store, used by tests and as a reference implementation of the
/// capability contract.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: std::collections::HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.values.get(key).cloned())
    }

    fn put_many(&mut self, pairs: &[(&str, &str)]) -> Result<(), AuthError> {
        for (k, v) in pairs {
            self.values.insert((*k).to_string(), (*v).to_string());
        }
        Ok(())
    }

    fn remove_many(&mut self, keys: &[&str]) -> Result<(), AuthError> {
        for k in keys {
            self.values.remove(*k);
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Credential store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The single durable [`Credential`], mapped onto the key-value capability.
#[derive(Debug)]
pub struct CredentialStore<S: KeyValueStore> {
    inner: S,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Load the stored credential, if any. Enrollment requires both the
    /// secret and the user id; anything less counts as "not enrolled".
    pub fn load(&self) -> Result<Option<Credential>, AuthError> {
        let secret = self.inner.get(KEY_SECRET)?;
        let user_id = self.inner.get(KEY_USER_ID)?;
        let (secret, user_id) = match (secret, user_id) {
            (Some(s), Some(u)) => (s, u),
            _ => return Ok(None),
        };

        let enrolled_at = self
            .inner
            .get(KEY_ENROLLED_AT)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            // Data written before the field existed has no usable timestamp.
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Ok(Some(Credential {
            secret: Secret::from_base32(secret),
            user_id,
            account_id: self.inner.get(KEY_ACCOUNT_ID)?.unwrap_or_default(),
            user_name: self.inner.get(KEY_USER_NAME)?.unwrap_or_default(),
            enrolled_at,
        }))
    }

    /// Persist a credential, replacing any previous one as a unit.
    pub fn save(&mut self, credential: &Credential) -> Result<(), AuthError> {
        let enrolled_at = credential.enrolled_at.to_rfc3339();
        self.inner.put_many(&[
            (KEY_SECRET, credential.secret.as_base32()),
            (KEY_USER_ID, &credential.user_id),
            (KEY_ACCOUNT_ID, &credential.account_id),
            (KEY_USER_NAME, &credential.user_name),
            (KEY_ENROLLED_AT, &enrolled_at),
        ])?;
        log::info!(
            "credential saved for user {} (secret: {} chars)",
            credential.user_id,
            credential.secret.as_base32().len()
        );
        Ok(())
    }

    /// Remove the stored credential, if any. Idempotent.
    pub fn clear(&mut self) -> Result<(), AuthError> {
        self.inner.remove_many(&ALL_KEYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::types::EnrollmentRequest;

    fn credential(user_id: &str, secret: &str) -> Credential {
        Credential::new(
            Secret::from_base32(secret),
            &EnrollmentRequest {
                user_id: user_id.into(),
                account_id: "acct-1".into(),
                user_name: "Jane".into(),
                timestamp: "123".into(),
            },
        )
    }

    // ── Round-trip ───────────────────────────────────────────────

    #[test]
    fn save_then_load() {
        let mut store = CredentialStore::new(MemoryStore::new());
        let cred = credential("u1", "JBSWY3DPEHPK3PXP");
        store.save(&cred).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.user_id, "u1");
        assert_eq!(loaded.account_id, "acct-1");
        assert_eq!(loaded.user_name, "Jane");
        assert_eq!(loaded.secret.as_base32(), "JBSWY3DPEHPK3PXP");
        // RFC 3339 round-trip is lossless at chrono's precision
        assert_eq!(loaded.enrolled_at, cred.enrolled_at);
    }

    #[test]
    fn absent_means_not_enrolled() {
        let store = CredentialStore::new(MemoryStore::new());
        assert!(store.load().unwrap().is_none());
    }

    // ── Presence requires secret AND user id ─────────────────────

    #[test]
    fn secret_without_user_id_is_not_enrolled() {
        let mut kv = MemoryStore::new();
        kv.put_many(&[(KEY_SECRET, "JBSWY3DPEHPK3PXP")]).unwrap();
        let store = CredentialStore::new(kv);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn user_id_without_secret_is_not_enrolled() {
        let mut kv = MemoryStore::new();
        kv.put_many(&[(KEY_USER_ID, "u1")]).unwrap();
        let store = CredentialStore::new(kv);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn missing_enrolled_at_defaults_to_epoch() {
        let mut kv = MemoryStore::new();
        kv.put_many(&[(KEY_SECRET, "JBSWY3DPEHPK3PXP"), (KEY_USER_ID, "u1")])
            .unwrap();
        let store = CredentialStore::new(kv);
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.enrolled_at, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(loaded.account_id, "");
    }

    // ── Replace & clear ──────────────────────────────────────────

    #[test]
    fn re_enrollment_replaces_wholesale() {
        let mut store = CredentialStore::new(MemoryStore::new());
        store.save(&credential("u1", "JBSWY3DPEHPK3PXP")).unwrap();
        store.save(&credential("u2", "GEZDGNBVGY3TQOJQ")).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.user_id, "u2");
        assert_eq!(loaded.secret.as_base32(), "GEZDGNBVGY3TQOJQ");
    }

    #[test]
    fn clear_is_idempotent() {
        let mut store = CredentialStore::new(MemoryStore::new());
        store.save(&credential("u1", "JBSWY3DPEHPK3PXP")).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
