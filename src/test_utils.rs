//! Test utilities for healthlink.
//!
//! Provides a scripted in-memory backend, test data factories, and assertion
//! macros for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use healthlink::test_utils::*;
//!
//! let backend = FakeBackend::new()
//!     .with_account("vital-1")
//!     .with_providers(make_test_providers());
//! backend.fail_next(FakeCall::ListProviders, HealthLinkError::Timeout(5));
//! ```

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::backend::{HealthBackend, LinkRequest};
use crate::core::account::UserSession;
use crate::core::opener::UrlOpener;
use crate::core::provider::{AuthType, Provider};
use crate::error::{HealthLinkError, Result};

// =============================================================================
// Fake Backend
// =============================================================================

/// Backend procedures, for scripting failures and counting calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeCall {
    Lookup,
    Create,
    ListProviders,
    ListConnected,
    LinkToken,
    ConnectDevice,
}

#[derive(Default)]
struct FakeState {
    account: Option<String>,
    echo_created_id: bool,
    persist_created: bool,
    providers: Vec<Provider>,
    connected: Vec<Provider>,
    token_granted: bool,
    link_url: String,
    queued: HashMap<FakeCall, VecDeque<HealthLinkError>>,
    always: HashMap<FakeCall, fn() -> HealthLinkError>,
    after: HashMap<FakeCall, (usize, fn() -> HealthLinkError)>,
    calls: HashMap<FakeCall, usize>,
    link_requests: Vec<LinkRequest>,
    sessions: Vec<UserSession>,
}

/// Scripted in-memory [`HealthBackend`].
///
/// Defaults: no account; `create` makes `vital-<user id>` and echoes it;
/// link tokens are granted; the authorization URL is
/// `https://link.example.com/authorize?token=test`.
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                echo_created_id: true,
                persist_created: true,
                token_granted: true,
                link_url: "https://link.example.com/authorize?token=test".to_string(),
                ..FakeState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut FakeState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builder: the user already has a remote account.
    #[must_use]
    pub fn with_account(mut self, remote_id: impl Into<String>) -> Self {
        self.state_mut().account = Some(remote_id.into());
        self
    }

    /// Builder: providers returned by the catalog endpoint.
    #[must_use]
    pub fn with_providers(mut self, providers: Vec<Provider>) -> Self {
        self.state_mut().providers = providers;
        self
    }

    /// Builder: providers already connected.
    #[must_use]
    pub fn with_connected(mut self, connected: Vec<Provider>) -> Self {
        self.state_mut().connected = connected;
        self
    }

    /// Builder: whether the link token request succeeds.
    #[must_use]
    pub fn with_token_granted(mut self, granted: bool) -> Self {
        self.state_mut().token_granted = granted;
        self
    }

    /// Builder: authorization URL returned by `connect_device`.
    #[must_use]
    pub fn with_link_url(mut self, url: impl Into<String>) -> Self {
        self.state_mut().link_url = url.into();
        self
    }

    /// Builder: `create` succeeds without echoing the new id.
    #[must_use]
    pub fn without_created_id(mut self) -> Self {
        self.state_mut().echo_created_id = false;
        self
    }

    /// Builder: `create` succeeds but a later lookup still finds nothing.
    #[must_use]
    pub fn with_unpersisted_create(mut self) -> Self {
        self.state_mut().persist_created = false;
        self
    }

    /// Fail the next call to `call` with `error`. Queued errors are used in order.
    pub fn fail_next(&self, call: FakeCall, error: HealthLinkError) {
        self.state().queued.entry(call).or_default().push_back(error);
    }

    /// Fail every call to `call` with a fresh error from `make`.
    pub fn fail_always(&self, call: FakeCall, make: fn() -> HealthLinkError) {
        self.state().always.insert(call, make);
    }

    /// Let the first `successes` calls to `call` through, then fail every
    /// later one with a fresh error from `make`.
    pub fn fail_after(&self, call: FakeCall, successes: usize, make: fn() -> HealthLinkError) {
        self.state().after.insert(call, (successes, make));
    }

    /// Stop failing `call`.
    pub fn recover(&self, call: FakeCall) {
        let mut state = self.state();
        state.always.remove(&call);
        state.after.remove(&call);
        state.queued.remove(&call);
    }

    /// Replace the connected list after construction.
    pub fn set_connected(&self, connected: Vec<Provider>) {
        self.state().connected = connected;
    }

    /// Number of calls made to `call`.
    #[must_use]
    pub fn calls(&self, call: FakeCall) -> usize {
        self.state().calls.get(&call).copied().unwrap_or(0)
    }

    /// Total number of backend calls.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    /// Requests seen by the token and connect procedures.
    #[must_use]
    pub fn link_requests(&self) -> Vec<LinkRequest> {
        self.state().link_requests.clone()
    }

    /// Sessions seen by any procedure.
    #[must_use]
    pub fn sessions(&self) -> Vec<UserSession> {
        self.state().sessions.clone()
    }

    /// Current remote account, as the backend sees it.
    #[must_use]
    pub fn account(&self) -> Option<String> {
        self.state().account.clone()
    }

    /// Count the call and return its scripted failure, if any.
    fn enter(&self, call: FakeCall, session: &UserSession) -> Result<MutexGuard<'_, FakeState>> {
        let mut state = self.state();
        let count = {
            let entry = state.calls.entry(call).or_insert(0);
            *entry += 1;
            *entry
        };
        state.sessions.push(session.clone());
        if let Some(error) = state.queued.get_mut(&call).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        if let Some(make) = state.always.get(&call) {
            return Err(make());
        }
        if let Some((successes, make)) = state.after.get(&call) {
            if count > *successes {
                return Err(make());
            }
        }
        Ok(state)
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthBackend for FakeBackend {
    async fn lookup_health_account(&self, session: &UserSession) -> Result<Option<String>> {
        let state = self.enter(FakeCall::Lookup, session)?;
        Ok(state.account.clone())
    }

    async fn create_health_account(&self, session: &UserSession) -> Result<Option<String>> {
        let mut state = self.enter(FakeCall::Create, session)?;
        if state.account.is_some() {
            return Err(HealthLinkError::AlreadyExists {
                message: "user already registered".to_string(),
            });
        }
        let id = format!("vital-{}", session.user_id);
        if state.persist_created {
            state.account = Some(id.clone());
        }
        Ok(state.echo_created_id.then_some(id))
    }

    async fn list_providers(&self, session: &UserSession) -> Result<Vec<Provider>> {
        let state = self.enter(FakeCall::ListProviders, session)?;
        Ok(state.providers.clone())
    }

    async fn list_connected_providers(
        &self,
        session: &UserSession,
        _remote_account_id: &str,
    ) -> Result<Vec<Provider>> {
        let state = self.enter(FakeCall::ListConnected, session)?;
        Ok(state.connected.clone())
    }

    async fn request_link_token(&self, session: &UserSession, request: &LinkRequest) -> Result<bool> {
        let mut state = self.enter(FakeCall::LinkToken, session)?;
        state.link_requests.push(request.clone());
        Ok(state.token_granted)
    }

    async fn connect_device(&self, session: &UserSession, request: &LinkRequest) -> Result<String> {
        let mut state = self.enter(FakeCall::ConnectDevice, session)?;
        state.link_requests.push(request.clone());
        Ok(state.link_url.clone())
    }
}

// =============================================================================
// Openers
// =============================================================================

/// Opener that always fails, as on a machine without a browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingOpener;

impl UrlOpener for FailingOpener {
    fn open(&self, _url: &str) -> Result<()> {
        Err(HealthLinkError::Config("no display available".to_string()))
    }
}

// =============================================================================
// Test Data Factories
// =============================================================================

/// A signed-in test user.
#[must_use]
pub fn make_test_session() -> UserSession {
    UserSession::new("user-123", "test-access-token")
}

/// A provider with the given identity and OAuth auth.
#[must_use]
pub fn make_test_provider(slug: &str, name: &str) -> Provider {
    Provider::new(slug, name, AuthType::Oauth).with_description(format!("{name} account data"))
}

/// A small mixed catalog: featured, non-featured and one SDK-only provider.
#[must_use]
pub fn make_test_providers() -> Vec<Provider> {
    vec![
        make_test_provider("withings", "Withings"),
        make_test_provider("garmin", "Garmin"),
        Provider::new("apple_health_kit", "Apple HealthKit", AuthType::Sdk),
        make_test_provider("oura", "Oura"),
        Provider::new("polar", "Polar", AuthType::EmailPassword),
    ]
}

/// Minimal config file pointing at `backend_url`.
#[must_use]
pub fn make_test_config_toml(backend_url: &str) -> String {
    format!(
        r#"[backend]
url = "{backend_url}"
api_key = "test-anon-key"
timeout_seconds = 5

[retry]
max_retries = 1
initial_delay_ms = 10
max_delay_ms = 20
"#
    )
}

// =============================================================================
// Temp Directory Utilities
// =============================================================================

/// A temporary directory for tests with automatic cleanup.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file with the given content, making parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
        path
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
    ($haystack:expr, $needle:expr, $($arg:tt)*) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(haystack.contains(needle), $($arg)*);
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string is valid JSON.
#[macro_export]
macro_rules! assert_json_valid {
    ($json:expr) => {
        let json = $json;
        if let Err(e) = serde_json::from_str::<serde_json::Value>(json) {
            panic!(
                "Expected valid JSON, but parsing failed: {}\n\nJSON string:\n{}",
                e, json
            );
        }
    };
}

/// Assert that a string is valid JSON equal to `expected`.
#[macro_export]
macro_rules! assert_json_eq {
    ($json:expr, $expected:expr) => {
        let json = $json;
        let parsed: serde_json::Value = serde_json::from_str(json).expect("Invalid JSON");
        let expected: serde_json::Value = $expected;
        assert_eq!(
            parsed,
            expected,
            "JSON mismatch\n\nExpected:\n{}\n\nActual:\n{}",
            serde_json::to_string_pretty(&expected).unwrap(),
            serde_json::to_string_pretty(&parsed).unwrap()
        );
    };
}

/// Assert that a string does NOT contain ANSI escape codes.
#[macro_export]
macro_rules! assert_no_ansi_codes {
    ($text:expr) => {
        let text = $text;
        assert!(
            !text.contains('\x1b'),
            "Expected string to NOT contain ANSI escape codes.\n\nActual string:\n{:?}",
            text
        );
    };
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Strip ANSI escape codes from a string.
#[must_use]
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_counts_and_scripts_failures() {
        let backend = FakeBackend::new().with_account("vital-1");
        let session = make_test_session();

        backend.fail_next(FakeCall::Lookup, HealthLinkError::Timeout(1));
        assert!(backend.lookup_health_account(&session).await.is_err());
        assert_eq!(
            backend.lookup_health_account(&session).await.unwrap(),
            Some("vital-1".to_string())
        );
        assert_eq!(backend.calls(FakeCall::Lookup), 2);
        assert_eq!(backend.total_calls(), 2);
    }

    #[tokio::test]
    async fn fake_create_then_conflict() {
        let backend = FakeBackend::new();
        let session = make_test_session();
        let id = backend.create_health_account(&session).await.unwrap();
        assert_eq!(id.as_deref(), Some("vital-user-123"));
        let err = backend.create_health_account(&session).await.unwrap_err();
        assert!(matches!(err, HealthLinkError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn fail_always_until_recovered() {
        let backend = FakeBackend::new();
        let session = make_test_session();
        backend.fail_always(FakeCall::ListProviders, || HealthLinkError::ServerError {
            status: 503,
            message: "down".to_string(),
        });
        assert!(backend.list_providers(&session).await.is_err());
        assert!(backend.list_providers(&session).await.is_err());
        backend.recover(FakeCall::ListProviders);
        assert!(backend.list_providers(&session).await.is_ok());
    }

    #[tokio::test]
    async fn fail_after_lets_early_calls_through() {
        let backend = FakeBackend::new().with_account("vital-1");
        let session = make_test_session();
        backend.fail_after(FakeCall::Lookup, 1, || HealthLinkError::Timeout(1));
        assert!(backend.lookup_health_account(&session).await.is_ok());
        assert!(backend.lookup_health_account(&session).await.is_err());
        assert!(backend.lookup_health_account(&session).await.is_err());
        backend.recover(FakeCall::Lookup);
        assert!(backend.lookup_health_account(&session).await.is_ok());
    }

    #[test]
    fn failing_opener_fails() {
        assert!(FailingOpener.open("https://a.example").is_err());
    }

    #[test]
    fn strip_ansi() {
        assert_eq!(strip_ansi_codes("\x1b[1;31mred\x1b[0m plain"), "red plain");
    }

    #[test]
    fn test_dir_creates_nested_files() {
        let dir = TestDir::new();
        let path = dir.create_file("a/b/config.toml", "x = 1");
        assert!(path.exists());
        assert_eq!(path, dir.file_path("a/b/config.toml"));
    }
}
