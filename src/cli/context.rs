//! Composition root shared by command handlers.

use std::sync::Arc;

use crate::backend::HttpBackend;
use crate::cli::args::{Cli, OutputFormat};
use crate::core::account::UserSession;
use crate::error::Result;
use crate::render::OutputOptions;
use crate::storage::config::ResolvedConfig;
use crate::storage::session::{KeyringStore, SessionStore, resolve_session};
use crate::util::env::{should_use_color, stdout_is_tty};

/// Everything a command needs besides its own arguments.
pub struct CommandContext {
    pub config: ResolvedConfig,
    pub output: OutputOptions,
    user_id: Option<String>,
    access_token: Option<String>,
    store: Box<dyn SessionStore>,
}

impl CommandContext {
    /// Context backed by the system keyring.
    #[must_use]
    pub fn new(cli: &Cli, config: ResolvedConfig) -> Self {
        Self::with_store(cli, config, Box::new(KeyringStore::new()))
    }

    /// Context backed by a caller-supplied session store.
    #[must_use]
    pub fn with_store(cli: &Cli, config: ResolvedConfig, store: Box<dyn SessionStore>) -> Self {
        let mut flags = Vec::new();
        if config.pretty {
            flags.push("pretty".to_string());
        }
        if cli.no_color {
            flags.push("no-color".to_string());
        }
        if cli.verbose {
            flags.push("verbose".to_string());
        }

        let output = OutputOptions {
            format: config.format,
            pretty: config.pretty,
            no_color: !should_use_color(config.no_color, stdout_is_tty()),
            flags,
        };

        Self {
            config,
            output,
            user_id: cli.user_id.clone(),
            access_token: cli.access_token.clone(),
            store,
        }
    }

    /// Output options with extra command-specific flags.
    #[must_use]
    pub fn output_with(&self, extra: &[&str]) -> OutputOptions {
        let mut output = self.output.clone();
        output.flags.extend(extra.iter().map(ToString::to_string));
        output
    }

    /// The signed-in user for this invocation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::HealthLinkError::SessionMissing`] when none is
    /// available.
    pub fn session(&self) -> Result<UserSession> {
        resolve_session(
            self.user_id.as_deref(),
            self.access_token.as_deref(),
            self.store.as_ref(),
        )
    }

    /// Session given on the command line or in the environment only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::HealthLinkError::SessionMissing`] when either
    /// field is absent.
    pub fn explicit_session(&self) -> Result<UserSession> {
        resolve_session(
            self.user_id.as_deref(),
            self.access_token.as_deref(),
            &crate::storage::session::MemoryStore::new(),
        )
    }

    #[must_use]
    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// HTTP client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the backend is not configured.
    pub fn backend(&self) -> Result<Arc<HttpBackend>> {
        let settings = self.config.backend_settings()?;
        tracing::debug!(host = %settings.host(), timeout_s = settings.timeout.as_secs(), "Backend configured");
        Ok(Arc::new(HttpBackend::new(settings)?))
    }

    /// Write a rendered result to stdout.
    pub fn emit(&self, rendered: &str) {
        match self.output.format {
            OutputFormat::Json => println!("{rendered}"),
            OutputFormat::Human => print!("{rendered}"),
        }
    }
}
