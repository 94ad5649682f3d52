//! Shared harness for integration tests.
//!
//! - `logger`: per-test phase and timing output on stderr
//! - `log_capture`: collect `tracing` events for assertions

pub mod log_capture;
pub mod logger;
