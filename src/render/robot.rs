//! Robot-mode output (JSON).
//!
//! Provides stable output for scripts and agents. Every document is a
//! [`RobotOutput`] envelope.

use serde::Serialize;

use crate::core::models::RobotOutput;
use crate::error::Result;

/// Render any value as compact JSON.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn render_json<T: Serialize>(output: &T) -> Result<String> {
    Ok(serde_json::to_string(output)?)
}

/// Render any value as pretty JSON.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn render_json_pretty<T: Serialize>(output: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(output)?)
}

/// Wrap `data` in the envelope for `command` and serialize it.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn render_envelope<T: Serialize>(
    command: &str,
    data: &T,
    flags: &[String],
    pretty: bool,
) -> Result<String> {
    let output = RobotOutput::new(command, data).with_flags(flags.to_vec());
    if pretty {
        render_json_pretty(&output)
    } else {
        render_json(&output)
    }
}
