//! Error types for healthlink.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five categories:
//! - **Configuration**: Missing or malformed backend endpoint, key, or session
//! - **Transient network**: Connection failures, timeouts, 5xx responses
//! - **Client**: 4xx-class responses, surfaced verbatim and never retried
//! - **Precondition**: Flow gates such as a missing health account
//! - **Unknown**: Everything else, surfaced with best-effort messages
//!
//! Each error has a stable error code (e.g., `HLNK-P001`) for programmatic handling.
//!
//! ## Fix Suggestions
//!
//! Each error type can provide actionable fix suggestions via the
//! [`HealthLinkError::fix_suggestions()`] method.

pub mod suggestions;

use thiserror::Error;

pub use suggestions::FixSuggestion;

/// Message shown when a device link is attempted before health tracking setup.
pub const SETUP_REQUIRED_MESSAGE: &str =
    "Please complete health tracking setup before connecting a device";

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Backend endpoint, API key, or user session is missing or malformed.
    Configuration,
    /// Transient transport or server failures (retryable).
    TransientNetwork,
    /// 4xx-class responses from the backend.
    Client,
    /// A flow precondition is not met.
    Precondition,
    /// Unclassified failures.
    Unknown,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration error",
            Self::TransientNetwork => "Network error",
            Self::Client => "Request rejected",
            Self::Precondition => "Setup required",
            Self::Unknown => "Unexpected error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Configuration => "C",
            Self::TransientNetwork => "N",
            Self::Client => "R",
            Self::Precondition => "P",
            Self::Unknown => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Health account not set up, or another flow precondition failed
    SetupRequired = 2,
    /// Configuration or session errors
    ConfigError = 3,
    /// Timeout or deadline exceeded
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for healthlink operations.
#[derive(Error, Debug)]
pub enum HealthLinkError {
    // ==========================================================================
    // Configuration errors
    // ==========================================================================
    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// No signed-in user session is available.
    #[error("no user session: sign in first")]
    SessionMissing,

    // ==========================================================================
    // Transient network errors
    // ==========================================================================
    /// The connection could not be established; the request never reached the server.
    #[error("connection failed: {host}")]
    ConnectionFailed { host: String },

    /// Request timed out.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Other transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Backend returned a 5xx response.
    #[error("server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    // ==========================================================================
    // Client errors
    // ==========================================================================
    /// Backend rejected the request with a 4xx response.
    #[error("{message}")]
    ClientError { status: u16, message: String },

    /// Bearer token or API key was rejected.
    #[error("unauthorized: {message}")]
    Unauthorized { status: u16, message: String },

    /// The remote resource already exists.
    #[error("already exists: {message}")]
    AlreadyExists { message: String },

    /// The slug is not part of the provider catalog.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    // ==========================================================================
    // Precondition errors
    // ==========================================================================
    /// The user has no health account with the aggregation service yet.
    #[error("health tracking setup required")]
    SetupRequired,

    /// The device-account credential was empty.
    #[error("please enter your device account email")]
    EmptyCredential,

    /// No provider is selected.
    #[error("no provider selected")]
    NoProviderSelected,

    /// The provider is already linked; re-linking is not supported.
    #[error("provider {0} is already connected")]
    ProviderAlreadyConnected(String),

    // ==========================================================================
    // Unknown errors
    // ==========================================================================
    /// Backend refused to issue a link token.
    #[error("failed to get connection link for {provider}")]
    LinkTokenDenied { provider: String },

    /// Account creation appeared to succeed but no id could be confirmed.
    #[error("health account for user {user_id} could not be confirmed")]
    RegistrationUnconfirmed { user_id: String },

    /// Hard wall-clock deadline elapsed while retrying.
    #[error("operation exceeded deadline of {0} seconds")]
    DeadlineExceeded(u64),

    /// Failed to parse backend response.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    /// Credential store failure.
    #[error("keyring error: {0}")]
    Keyring(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HealthLinkError {
    /// Map error to process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_)
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::SessionMissing => ExitCode::ConfigError,

            Self::SetupRequired
            | Self::EmptyCredential
            | Self::NoProviderSelected
            | Self::ProviderAlreadyConnected(_) => ExitCode::SetupRequired,

            Self::Timeout(_) | Self::DeadlineExceeded(_) => ExitCode::Timeout,

            Self::ConnectionFailed { .. }
            | Self::Network(_)
            | Self::ServerError { .. }
            | Self::ClientError { .. }
            | Self::Unauthorized { .. }
            | Self::AlreadyExists { .. }
            | Self::UnknownProvider(_)
            | Self::LinkTokenDenied { .. }
            | Self::RegistrationUnconfirmed { .. }
            | Self::ParseResponse(_)
            | Self::Keyring(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_)
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::SessionMissing => ErrorCategory::Configuration,

            Self::ConnectionFailed { .. }
            | Self::Timeout(_)
            | Self::Network(_)
            | Self::ServerError { .. } => ErrorCategory::TransientNetwork,

            Self::ClientError { .. }
            | Self::Unauthorized { .. }
            | Self::AlreadyExists { .. }
            | Self::UnknownProvider(_) => ErrorCategory::Client,

            Self::SetupRequired
            | Self::EmptyCredential
            | Self::NoProviderSelected
            | Self::ProviderAlreadyConnected(_) => ErrorCategory::Precondition,

            Self::LinkTokenDenied { .. }
            | Self::RegistrationUnconfirmed { .. }
            | Self::DeadlineExceeded(_)
            | Self::ParseResponse(_)
            | Self::Keyring(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ErrorCategory::Unknown,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `HLNK-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "HLNK-C001",
            Self::ConfigParse { .. } => "HLNK-C002",
            Self::ConfigInvalid { .. } => "HLNK-C003",
            Self::SessionMissing => "HLNK-C010",

            Self::ConnectionFailed { .. } => "HLNK-N001",
            Self::Timeout(_) => "HLNK-N002",
            Self::ServerError { .. } => "HLNK-N003",
            Self::Network(_) => "HLNK-N099",

            Self::ClientError { .. } => "HLNK-R001",
            Self::Unauthorized { .. } => "HLNK-R002",
            Self::AlreadyExists { .. } => "HLNK-R003",
            Self::UnknownProvider(_) => "HLNK-R010",

            Self::SetupRequired => "HLNK-P001",
            Self::EmptyCredential => "HLNK-P002",
            Self::NoProviderSelected => "HLNK-P003",
            Self::ProviderAlreadyConnected(_) => "HLNK-P004",

            Self::LinkTokenDenied { .. } => "HLNK-X001",
            Self::RegistrationUnconfirmed { .. } => "HLNK-X002",
            Self::DeadlineExceeded(_) => "HLNK-X003",
            Self::ParseResponse(_) => "HLNK-X010",
            Self::Keyring(_) => "HLNK-X020",
            Self::Io(_) => "HLNK-X030",
            Self::Json(_) => "HLNK-X031",
            Self::Other(_) => "HLNK-X099",
        }
    }

    /// Returns whether the error is a transient condition worth retrying.
    ///
    /// Only transport failures and 5xx responses qualify; client errors,
    /// auth failures and preconditions fail fast.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::TransientNetwork)
    }

    /// Whether the request provably never reached the server.
    ///
    /// Non-idempotent calls may only be retried on these.
    #[must_use]
    pub const fn is_unsent(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. })
    }

    /// Message suitable for showing to the end user in a session.
    ///
    /// Precondition failures are rewritten to actionable guidance; client
    /// errors carry the backend's own message verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::SetupRequired => SETUP_REQUIRED_MESSAGE.to_string(),
            Self::EmptyCredential => "Please enter your device account email".to_string(),
            Self::ClientError { message, .. } => message.clone(),
            Self::LinkTokenDenied { .. } => "Failed to get connection link".to_string(),
            Self::Other(_) | Self::Io(_) | Self::Json(_) => {
                "Failed to connect device. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Returns actionable fix suggestions for this error.
    #[must_use]
    pub fn fix_suggestions(&self) -> Vec<FixSuggestion> {
        match self {
            Self::Config(msg) => suggestions::config_suggestions(msg),
            Self::ConfigParse { path, message } => {
                suggestions::config_parse_suggestions(path, message)
            }
            Self::ConfigInvalid { key, value, message } => {
                suggestions::config_invalid_suggestions(key, value, message)
            }
            Self::SessionMissing => suggestions::session_missing_suggestions(),

            Self::ConnectionFailed { host } => suggestions::connection_failed_suggestions(host),
            Self::Timeout(seconds) => suggestions::timeout_suggestions(*seconds),
            Self::DeadlineExceeded(seconds) => suggestions::timeout_suggestions(*seconds),
            Self::ServerError { status, .. } => suggestions::server_error_suggestions(*status),
            Self::Network(msg) => vec![FixSuggestion::new(
                vec!["healthlink status".to_string()],
                format!("Network error: {msg}. Check your internet connection."),
            )],

            Self::Unauthorized { .. } => suggestions::unauthorized_suggestions(),
            Self::UnknownProvider(slug) => suggestions::unknown_provider_suggestions(slug),
            Self::ProviderAlreadyConnected(slug) => {
                suggestions::already_connected_suggestions(slug)
            }
            Self::SetupRequired | Self::RegistrationUnconfirmed { .. } => {
                suggestions::setup_required_suggestions()
            }
            Self::EmptyCredential | Self::NoProviderSelected => vec![FixSuggestion::new(
                vec!["healthlink connect <provider> --email <device-account-email>".to_string()],
                "Linking needs both a provider slug and the email of the device account.",
            )],
            Self::Keyring(_) => vec![FixSuggestion::new(
                vec![
                    "export HEALTHLINK_USER_ID=<user id>".to_string(),
                    "export HEALTHLINK_ACCESS_TOKEN=<token>".to_string(),
                ],
                "The system keyring is unavailable. Provide the session through the environment instead.",
            )],

            Self::ClientError { .. }
            | Self::AlreadyExists { .. }
            | Self::LinkTokenDenied { .. }
            | Self::ParseResponse(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => Vec::new(),
        }
    }
}

/// Result type alias for healthlink operations.
pub type Result<T> = std::result::Result<T, HealthLinkError>;
