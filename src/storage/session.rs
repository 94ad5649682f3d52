//! Signed-in user session storage.
//!
//! The session is the host's sign-in state: a local user id and the bearer
//! token for backend calls. Resolution order per field: CLI flag, then
//! environment, then the system keyring.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::core::account::UserSession;
use crate::error::{HealthLinkError, Result};

/// Environment variable for the local user id.
pub const ENV_USER_ID: &str = "HEALTHLINK_USER_ID";
/// Environment variable for the access token.
pub const ENV_ACCESS_TOKEN: &str = "HEALTHLINK_ACCESS_TOKEN";

/// Keyring service name.
pub const KEYRING_SERVICE: &str = "healthlink";
const KEYRING_ENTRY: &str = "session";

/// Persistent home for the session.
pub trait SessionStore: Send + Sync {
    /// The stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreadable.
    fn load(&self) -> Result<Option<UserSession>>;

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unwritable.
    fn save(&self, session: &UserSession) -> Result<()>;

    /// Remove the stored session. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unwritable.
    fn clear(&self) -> Result<bool>;
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    user_id: String,
    access_token: String,
}

/// Session kept in the OS credential store.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, KEYRING_ENTRY)
            .map_err(|e| HealthLinkError::Keyring(e.to_string()))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringStore {
    fn load(&self) -> Result<Option<UserSession>> {
        match self.entry()?.get_password() {
            Ok(raw) => {
                let stored: StoredSession = serde_json::from_str(&raw)?;
                Ok(Some(UserSession::new(stored.user_id, stored.access_token)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(HealthLinkError::Keyring(e.to_string())),
        }
    }

    fn save(&self, session: &UserSession) -> Result<()> {
        let raw = serde_json::to_string(&StoredSession {
            user_id: session.user_id.clone(),
            access_token: session.access_token.clone(),
        })?;
        self.entry()?
            .set_password(&raw)
            .map_err(|e| HealthLinkError::Keyring(e.to_string()))?;
        tracing::debug!(user = %session.user_id, token = %session.token_fingerprint(), "Session stored in keyring");
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(HealthLinkError::Keyring(e.to_string())),
        }
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Option<UserSession>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: UserSession) -> Self {
        Self {
            inner: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<UserSession>> {
        Ok(self
            .inner
            .lock()
            .map_err(|_| HealthLinkError::Keyring("session store poisoned".to_string()))?
            .clone())
    }

    fn save(&self, session: &UserSession) -> Result<()> {
        *self
            .inner
            .lock()
            .map_err(|_| HealthLinkError::Keyring("session store poisoned".to_string()))? =
            Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .map_err(|_| HealthLinkError::Keyring("session store poisoned".to_string()))?
            .take()
            .is_some())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the session for this invocation.
///
/// A store that cannot be read counts as empty; the failure is logged.
///
/// # Errors
///
/// Returns [`HealthLinkError::SessionMissing`] when either field is absent
/// everywhere.
pub fn resolve_session(
    cli_user_id: Option<&str>,
    cli_access_token: Option<&str>,
    store: &dyn SessionStore,
) -> Result<UserSession> {
    let mut user_id = non_empty(cli_user_id.map(str::to_string))
        .or_else(|| non_empty(std::env::var(ENV_USER_ID).ok()));
    let mut access_token = non_empty(cli_access_token.map(str::to_string))
        .or_else(|| non_empty(std::env::var(ENV_ACCESS_TOKEN).ok()));

    if user_id.is_none() || access_token.is_none() {
        match store.load() {
            Ok(Some(stored)) => {
                user_id = user_id.or(Some(stored.user_id));
                access_token = access_token.or(Some(stored.access_token));
            }
            Ok(None) => {}
            Err(err) => tracing::debug!(error = %err, "Session store unavailable"),
        }
    }

    match (user_id, access_token) {
        (Some(user_id), Some(access_token)) => Ok(UserSession::new(user_id, access_token)),
        _ => Err(HealthLinkError::SessionMissing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[allow(unsafe_code)]
    fn with_session_env(user: Option<&str>, token: Option<&str>, f: impl FnOnce()) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let saved = (std::env::var(ENV_USER_ID).ok(), std::env::var(ENV_ACCESS_TOKEN).ok());
        let apply = |key: &str, value: Option<&str>| match value {
            Some(v) => unsafe { std::env::set_var(key, v) },
            None => unsafe { std::env::remove_var(key) },
        };
        apply(ENV_USER_ID, user);
        apply(ENV_ACCESS_TOKEN, token);
        f();
        apply(ENV_USER_ID, saved.0.as_deref());
        apply(ENV_ACCESS_TOKEN, saved.1.as_deref());
    }

    struct BrokenStore;

    impl SessionStore for BrokenStore {
        fn load(&self) -> Result<Option<UserSession>> {
            Err(HealthLinkError::Keyring("no secret service".to_string()))
        }
        fn save(&self, _: &UserSession) -> Result<()> {
            Err(HealthLinkError::Keyring("no secret service".to_string()))
        }
        fn clear(&self) -> Result<bool> {
            Err(HealthLinkError::Keyring("no secret service".to_string()))
        }
    }

    #[test]
    fn cli_flags_win() {
        with_session_env(Some("env-user"), Some("env-token"), || {
            let store = MemoryStore::with_session(UserSession::new("stored", "stored-token"));
            let session = resolve_session(Some("cli-user"), Some("cli-token"), &store).unwrap();
            assert_eq!(session, UserSession::new("cli-user", "cli-token"));
        });
    }

    #[test]
    fn env_beats_store() {
        with_session_env(Some("env-user"), Some("env-token"), || {
            let store = MemoryStore::with_session(UserSession::new("stored", "stored-token"));
            let session = resolve_session(None, None, &store).unwrap();
            assert_eq!(session.user_id, "env-user");
        });
    }

    #[test]
    fn store_fills_missing_fields() {
        with_session_env(None, None, || {
            let store = MemoryStore::with_session(UserSession::new("stored", "stored-token"));
            let session = resolve_session(Some("cli-user"), None, &store).unwrap();
            assert_eq!(session.user_id, "cli-user");
            assert_eq!(session.access_token, "stored-token");
        });
    }

    #[test]
    fn missing_everywhere_is_session_missing() {
        with_session_env(None, Some("  "), || {
            let err = resolve_session(None, None, &MemoryStore::new()).unwrap_err();
            assert!(matches!(err, HealthLinkError::SessionMissing));
        });
    }

    #[test]
    fn unreadable_store_counts_as_empty() {
        with_session_env(None, None, || {
            let err = resolve_session(None, None, &BrokenStore).unwrap_err();
            assert!(matches!(err, HealthLinkError::SessionMissing));
        });
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&UserSession::new("u", "t")).unwrap();
        assert_eq!(store.load().unwrap(), Some(UserSession::new("u", "t")));
        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
    }
}
