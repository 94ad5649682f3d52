//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::core::models::{
    ConnectPayload, ProvidersPayload, SessionPayload, SetupPayload, StatusPayload,
};
use crate::error::Result;

/// How command results are written.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub no_color: bool,
    /// Flags echoed in the JSON envelope's `meta.flags`.
    pub flags: Vec<String>,
}

fn render_with<T: Serialize>(
    command: &str,
    payload: &T,
    options: &OutputOptions,
    human: fn(&T, bool) -> String,
) -> Result<String> {
    match options.format {
        OutputFormat::Human => Ok(human(payload, options.no_color)),
        OutputFormat::Json => robot::render_envelope(command, payload, &options.flags, options.pretty),
    }
}

/// Render the `setup` result.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render_setup(payload: &SetupPayload, options: &OutputOptions) -> Result<String> {
    render_with("setup", payload, options, human::render_setup)
}

/// Render the `status` result.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render_status(payload: &StatusPayload, options: &OutputOptions) -> Result<String> {
    render_with("status", payload, options, human::render_status)
}

/// Render the `providers` result.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render_providers(payload: &ProvidersPayload, options: &OutputOptions) -> Result<String> {
    render_with("providers", payload, options, human::render_providers)
}

/// Render the `connect` result.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render_connect(payload: &ConnectPayload, options: &OutputOptions) -> Result<String> {
    render_with("connect", payload, options, human::render_connect)
}

/// Render the `login` result.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render_login(payload: &SessionPayload, options: &OutputOptions) -> Result<String> {
    render_with("login", payload, options, human::render_login)
}

/// Render the `logout` result.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render_logout(payload: &SessionPayload, options: &OutputOptions) -> Result<String> {
    render_with("logout", payload, options, human::render_logout)
}
