//! Utility functions.

pub mod env;

pub use env::{should_use_color, stderr_is_tty, stdout_is_tty};
