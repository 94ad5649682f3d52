//! Fix suggestion database for healthlink errors.
//!
//! Provides actionable fix suggestions mapped to specific error types,
//! including commands, context explanations, and prevention tips.

use crate::storage::config::{ENV_API_KEY, ENV_BACKEND_URL};

// =============================================================================
// Fix Suggestion Types
// =============================================================================

/// A fix suggestion for an error.
///
/// Contains actionable information to help users resolve errors.
#[derive(Debug, Clone)]
pub struct FixSuggestion {
    /// Primary fix commands in order of preference.
    /// These should be copy-paste ready for the terminal.
    pub commands: Vec<String>,

    /// Explanation of why this error occurred.
    pub context: String,

    /// Tips to prevent this error in the future.
    pub prevention: Option<String>,
}

impl FixSuggestion {
    /// Creates a new fix suggestion with required fields.
    #[must_use]
    pub fn new(commands: Vec<String>, context: impl Into<String>) -> Self {
        Self {
            commands,
            context: context.into(),
            prevention: None,
        }
    }

    /// Builder: adds prevention tips.
    #[must_use]
    pub fn with_prevention(mut self, prevention: impl Into<String>) -> Self {
        self.prevention = Some(prevention.into());
        self
    }
}

// =============================================================================
// Suggestion Generators
// =============================================================================

/// Generates fix suggestions for generic configuration errors.
#[must_use]
pub fn config_suggestions(message: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![
                format!("export {ENV_BACKEND_URL}=https://<project>.supabase.co"),
                format!("export {ENV_API_KEY}=<anon key>"),
            ],
            format!("Configuration error: {message}"),
        )
        .with_prevention(
            "Put the backend URL and API key in the [backend] section of config.toml.",
        ),
    ]
}

/// Generates fix suggestions for config parse errors.
#[must_use]
pub fn config_parse_suggestions(path: &str, message: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![format!("$EDITOR {path}")],
            format!("The config file has a syntax error. The TOML parser reported: {message}"),
        )
        .with_prevention("Use a TOML-aware editor with syntax highlighting."),
    ]
}

/// Generates fix suggestions for invalid config value errors.
#[must_use]
pub fn config_invalid_suggestions(key: &str, value: &str, message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("# Fix '{key}' in config.toml or the environment")],
        format!("Invalid config value for '{key}': '{value}'. {message}"),
    )]
}

/// Generates fix suggestions for a missing user session.
#[must_use]
pub fn session_missing_suggestions() -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![
                "healthlink login --user-id <user id> --access-token <token>".to_string(),
                "export HEALTHLINK_USER_ID=<user id> HEALTHLINK_ACCESS_TOKEN=<token>".to_string(),
            ],
            "Every backend call is made on behalf of a signed-in user, and no session \
             was found on the command line, in the environment, or in the keyring.",
        ),
    ]
}

/// Generates fix suggestions for connection failures.
#[must_use]
pub fn connection_failed_suggestions(host: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![format!("curl -v {host}")],
            format!(
                "Could not connect to {host}. The request was retried with backoff \
                 and never reached the backend."
            ),
        )
        .with_prevention("Check network connectivity and the configured backend URL."),
    ]
}

/// Generates fix suggestions for timeout errors.
#[must_use]
pub fn timeout_suggestions(seconds: u64) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec!["healthlink status".to_string()],
            format!("The backend did not respond within {seconds}s."),
        )
        .with_prevention(
            "Raise backend.timeout_seconds or retry.deadline_seconds in config.toml.",
        ),
    ]
}

/// Generates fix suggestions for 5xx responses.
#[must_use]
pub fn server_error_suggestions(status: u16) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["healthlink status".to_string()],
        format!(
            "The backend answered HTTP {status} on every attempt. This is usually a \
             transient outage on the backend side; wait and try again."
        ),
    )]
}

/// Generates fix suggestions for rejected credentials.
#[must_use]
pub fn unauthorized_suggestions() -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![
                "healthlink logout".to_string(),
                "healthlink login --user-id <user id> --access-token <token>".to_string(),
            ],
            "The backend rejected the session token or API key. Session tokens expire; \
             sign in again to obtain a fresh one.",
        ),
    ]
}

/// Generates fix suggestions for a missing health account.
#[must_use]
pub fn setup_required_suggestions() -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec!["healthlink setup".to_string()],
            "Devices can only be linked once a health tracking account exists for \
             your user.",
        )
        .with_prevention("Run `healthlink setup` once per user before connecting devices."),
    ]
}

/// Generates fix suggestions for slugs not present in the catalog.
#[must_use]
pub fn unknown_provider_suggestions(slug: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("healthlink providers --search {slug}")],
        format!("'{slug}' is not a linkable provider. Provider slugs are listed by `healthlink providers`."),
    )]
}

/// Generates fix suggestions for already-connected providers.
#[must_use]
pub fn already_connected_suggestions(slug: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["healthlink status".to_string()],
        format!("{slug} is already linked to your health account; re-linking is not supported."),
    )]
}
