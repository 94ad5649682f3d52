//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux: `~/.config/healthlink/config.toml`
//! - macOS: `~/Library/Application Support/healthlink/config.toml`
//! - Windows: `%APPDATA%/healthlink/config/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `HEALTHLINK_BACKEND_URL`: Backend base URL
//! - `HEALTHLINK_API_KEY`: Static project API key
//! - `HEALTHLINK_TIMEOUT`: Per-request timeout in seconds
//! - `HEALTHLINK_FORMAT`: Output format (human, json)
//! - `HEALTHLINK_NO_COLOR` or `NO_COLOR`: Disable colors
//! - `HEALTHLINK_VERBOSE`: Enable verbose output (1, true, yes)
//! - `HEALTHLINK_PRETTY`: Pretty-print JSON output (1, true, yes)
//! - `HEALTHLINK_CONFIG`: Override config file path

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::backend::BackendSettings;
use crate::cli::args::{Cli, OutputFormat};
use crate::core::provider::DEFAULT_FEATURED;
use crate::core::retry::RetryPolicies;
use crate::error::{HealthLinkError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable for the backend base URL.
pub const ENV_BACKEND_URL: &str = "HEALTHLINK_BACKEND_URL";
/// Environment variable for the static API key.
pub const ENV_API_KEY: &str = "HEALTHLINK_API_KEY";
/// Environment variable for output format.
pub const ENV_FORMAT: &str = "HEALTHLINK_FORMAT";
/// Environment variable for timeout in seconds.
pub const ENV_TIMEOUT: &str = "HEALTHLINK_TIMEOUT";
/// Environment variable to disable colors.
pub const ENV_NO_COLOR: &str = "HEALTHLINK_NO_COLOR";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";
/// Environment variable for verbose output.
pub const ENV_VERBOSE: &str = "HEALTHLINK_VERBOSE";
/// Environment variable for pretty JSON output.
pub const ENV_PRETTY: &str = "HEALTHLINK_PRETTY";
/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "HEALTHLINK_CONFIG";

const MAX_TIMEOUT_SECONDS: u64 = 600;
const MAX_RETRIES: u32 = 10;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Backend base URL, if configured anywhere.
    pub backend_url: Option<String>,
    /// Static API key, if configured anywhere.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policies for reads and writes.
    pub retry: RetryPolicies,
    /// Featured provider names.
    pub featured: Vec<String>,
    /// Output format.
    pub format: OutputFormat,
    /// Whether to disable colored output.
    pub no_color: bool,
    /// Whether verbose logging is enabled.
    pub verbose: bool,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
    /// Config file that was consulted.
    pub config_path: PathBuf,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub backend_url: ConfigSource,
    pub api_key: ConfigSource,
    pub timeout: ConfigSource,
    pub format: ConfigSource,
    pub no_color: ConfigSource,
    pub verbose: ConfigSource,
    pub pretty: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid, or if any
    /// resolved value is out of range.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config_path = Self::config_path();
        let config = Config::load_from(&config_path)?;
        config.validate()?;

        let mut sources = ConfigSources::default();

        let backend_url = Self::resolve_string(
            ENV_BACKEND_URL,
            config.backend.url.as_deref(),
            &mut sources.backend_url,
        );
        if let Some(url) = &backend_url {
            validate_backend_url(url)?;
        }
        let api_key =
            Self::resolve_string(ENV_API_KEY, config.backend.api_key.as_deref(), &mut sources.api_key);
        let timeout = Self::resolve_timeout(&config, &mut sources.timeout)?;
        let format = Self::resolve_format(cli, &config, &mut sources.format)?;
        let no_color = Self::resolve_no_color(cli, &config, &mut sources.no_color);
        let verbose = Self::resolve_verbose(cli, &mut sources.verbose);
        let pretty = Self::resolve_pretty(cli, &config, &mut sources.pretty);

        Ok(Self {
            backend_url,
            api_key,
            timeout,
            retry: config.retry.policies(),
            featured: config.catalog.featured,
            format,
            no_color,
            verbose,
            pretty,
            config_path,
            sources,
        })
    }

    /// Config file path, respecting the `HEALTHLINK_CONFIG` override.
    #[must_use]
    pub fn config_path() -> PathBuf {
        std::env::var(ENV_CONFIG)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map_or_else(|| AppPaths::new().config_file(), PathBuf::from)
    }

    /// Backend connection settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the URL or API key is missing.
    pub fn backend_settings(&self) -> Result<BackendSettings> {
        let url = self.backend_url.clone().ok_or_else(|| {
            HealthLinkError::Config(format!(
                "backend URL is not configured (set {ENV_BACKEND_URL} or [backend] url)"
            ))
        })?;
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                HealthLinkError::Config(format!(
                    "API key is not configured (set {ENV_API_KEY} or [backend] api_key)"
                ))
            })?;
        Ok(BackendSettings::new(url, api_key, self.timeout))
    }

    fn resolve_string(env: &str, file: Option<&str>, source: &mut ConfigSource) -> Option<String> {
        if let Some(value) = non_empty_env(env) {
            *source = ConfigSource::Env;
            return Some(value);
        }
        if let Some(value) = file.map(str::trim).filter(|v| !v.is_empty()) {
            *source = ConfigSource::ConfigFile;
            return Some(value.to_string());
        }
        *source = ConfigSource::Default;
        None
    }

    fn resolve_timeout(config: &Config, source: &mut ConfigSource) -> Result<Duration> {
        if let Some(raw) = non_empty_env(ENV_TIMEOUT) {
            *source = ConfigSource::Env;
            let seconds = raw.parse::<u64>().map_err(|_| HealthLinkError::ConfigInvalid {
                key: ENV_TIMEOUT.to_string(),
                value: raw.clone(),
                message: "must be a whole number of seconds".to_string(),
            })?;
            validate_timeout(ENV_TIMEOUT, seconds)?;
            return Ok(Duration::from_secs(seconds));
        }

        *source = ConfigSource::ConfigFile;
        Ok(Duration::from_secs(config.backend.timeout_seconds))
    }

    fn resolve_format(cli: &Cli, config: &Config, source: &mut ConfigSource) -> Result<OutputFormat> {
        if cli.json {
            *source = ConfigSource::Cli;
            return Ok(OutputFormat::Json);
        }

        if let Some(format_env) = non_empty_env(ENV_FORMAT) {
            *source = ConfigSource::Env;
            return parse_format(ENV_FORMAT, &format_env);
        }

        // clap fills the default, so only a non-default value counts as explicit
        if cli.format != OutputFormat::Human {
            *source = ConfigSource::Cli;
            return Ok(cli.format);
        }

        if let Some(format) = &config.output.format {
            *source = ConfigSource::ConfigFile;
            return parse_format("output.format", format);
        }

        *source = ConfigSource::Default;
        Ok(OutputFormat::Human)
    }

    fn resolve_no_color(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        if cli.no_color {
            *source = ConfigSource::Cli;
            return true;
        }

        if is_env_truthy(ENV_NO_COLOR) || std::env::var_os(ENV_NO_COLOR_STD).is_some() {
            *source = ConfigSource::Env;
            return true;
        }

        if !config.output.color {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        *source = ConfigSource::Default;
        false
    }

    fn resolve_verbose(cli: &Cli, source: &mut ConfigSource) -> bool {
        if cli.verbose {
            *source = ConfigSource::Cli;
            return true;
        }
        if is_env_truthy(ENV_VERBOSE) {
            *source = ConfigSource::Env;
            return true;
        }
        *source = ConfigSource::Default;
        false
    }

    fn resolve_pretty(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        if cli.pretty {
            *source = ConfigSource::Cli;
            return true;
        }
        if is_env_truthy(ENV_PRETTY) {
            *source = ConfigSource::Env;
            return true;
        }
        if config.output.pretty {
            *source = ConfigSource::ConfigFile;
            return true;
        }
        *source = ConfigSource::Default;
        false
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Check if an environment variable is set to a truthy value.
#[must_use]
pub fn is_env_truthy(var: &str) -> bool {
    std::env::var(var)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn parse_format(key: &str, value: &str) -> Result<OutputFormat> {
    match value.trim().to_lowercase().as_str() {
        "human" => Ok(OutputFormat::Human),
        "json" => Ok(OutputFormat::Json),
        _ => Err(HealthLinkError::ConfigInvalid {
            key: key.to_string(),
            value: value.to_string(),
            message: "valid formats: human, json".to_string(),
        }),
    }
}

fn validate_timeout(key: &str, seconds: u64) -> Result<()> {
    if seconds == 0 || seconds > MAX_TIMEOUT_SECONDS {
        return Err(HealthLinkError::ConfigInvalid {
            key: key.to_string(),
            value: seconds.to_string(),
            message: format!("timeout must be between 1 and {MAX_TIMEOUT_SECONDS} seconds"),
        });
    }
    Ok(())
}

/// The backend URL must be https; plain http is accepted for loopback only.
///
/// # Errors
///
/// Returns [`HealthLinkError::ConfigInvalid`] for anything else.
pub fn validate_backend_url(url: &str) -> Result<()> {
    let invalid = |message: &str| HealthLinkError::ConfigInvalid {
        key: "backend.url".to_string(),
        value: url.to_string(),
        message: message.to_string(),
    };

    let parsed = reqwest::Url::parse(url).map_err(|e| invalid(&format!("not a valid URL: {e}")))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(&parsed) => Ok(()),
        "http" => Err(invalid("plain http is only allowed for localhost; use https")),
        other => Err(invalid(&format!("unsupported scheme '{other}'"))),
    }
}

/// Whether `url` points at this machine.
pub(crate) fn is_loopback(url: &reqwest::Url) -> bool {
    url.host_str().is_some_and(|host| {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        host.eq_ignore_ascii_case("localhost")
            || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
    })
}

// =============================================================================
// Config file
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection.
    pub backend: BackendConfig,
    /// Retry timing.
    pub retry: RetryConfig,
    /// Catalog presentation.
    pub catalog: CatalogConfig,
    /// Output settings.
    pub output: OutputConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://project.supabase.co`.
    pub url: Option<String>,
    /// Static project API key.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

/// Retry timing shared by read and write policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Hard limit across all attempts of one call. Unset means none.
    pub deadline_seconds: Option<u64>,
}

/// Catalog presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Provider names listed first, in any case.
    pub featured: Vec<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (human, json).
    pub format: Option<String>,
    /// Whether to use colors in output.
    pub color: bool,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            deadline_seconds: None,
        }
    }
}

impl RetryConfig {
    /// Policies built from these timings.
    #[must_use]
    pub fn policies(&self) -> RetryPolicies {
        RetryPolicies::from_timing(
            self.max_retries,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.deadline_seconds.map(Duration::from_secs),
        )
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            featured: DEFAULT_FEATURED.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            pretty: false,
        }
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().config_file())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| HealthLinkError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| HealthLinkError::Config(format!("Failed to serialize config: {e}")))?;

        fs::write(path, content)?;
        tracing::debug!(?path, "Config file saved");
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`HealthLinkError::ConfigInvalid`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.backend.url {
            validate_backend_url(url)?;
        }

        if let Some(key) = &self.backend.api_key
            && key.trim().is_empty()
        {
            return Err(HealthLinkError::ConfigInvalid {
                key: "backend.api_key".to_string(),
                value: String::new(),
                message: "API key must not be empty".to_string(),
            });
        }

        validate_timeout("backend.timeout_seconds", self.backend.timeout_seconds)?;

        if self.retry.max_retries > MAX_RETRIES {
            return Err(HealthLinkError::ConfigInvalid {
                key: "retry.max_retries".to_string(),
                value: self.retry.max_retries.to_string(),
                message: format!("at most {MAX_RETRIES} retries are allowed"),
            });
        }

        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(HealthLinkError::ConfigInvalid {
                key: "retry.max_delay_ms".to_string(),
                value: self.retry.max_delay_ms.to_string(),
                message: format!(
                    "must be at least retry.initial_delay_ms ({})",
                    self.retry.initial_delay_ms
                ),
            });
        }

        if self.retry.deadline_seconds == Some(0) {
            return Err(HealthLinkError::ConfigInvalid {
                key: "retry.deadline_seconds".to_string(),
                value: "0".to_string(),
                message: "remove the key to disable the deadline".to_string(),
            });
        }

        if let Some(format) = &self.output.format {
            parse_format("output.format", format)?;
        }

        Ok(())
    }
}
