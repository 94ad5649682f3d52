//! Terminal detection.

use std::io::IsTerminal;

use crate::storage::config::{ENV_NO_COLOR, ENV_NO_COLOR_STD, is_env_truthy};

/// Check if stdout is a TTY.
#[must_use]
pub fn stdout_is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Check if stderr is a TTY.
#[must_use]
pub fn stderr_is_tty() -> bool {
    std::io::stderr().is_terminal()
}

/// Whether the terminal can't render ANSI styling.
#[must_use]
pub fn is_dumb_terminal() -> bool {
    std::env::var("TERM").is_ok_and(|t| t == "dumb")
}

/// Decide whether a stream gets colored output.
///
/// `is_tty` is the answer for the stream being written.
#[must_use]
pub fn should_use_color(no_color_flag: bool, is_tty: bool) -> bool {
    if no_color_flag
        || is_env_truthy(ENV_NO_COLOR)
        || std::env::var_os(ENV_NO_COLOR_STD).is_some()
        || is_dumb_terminal()
    {
        return false;
    }
    is_tty
}
