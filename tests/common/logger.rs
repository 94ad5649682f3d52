//! Phase-tagged test output.
//!
//! Lines go to stderr so `cargo test -- --nocapture` shows where a slow or
//! failing test spent its time. Controlled by:
//!
//! - `HEALTHLINK_TEST_LOG`: minimum level (`debug`, `info`, `warn`; default `info`)
//! - `HEALTHLINK_TEST_LOG_JSON`: `1`/`true` for one JSON object per line
//! - `HEALTHLINK_TEST_LOG_FILE`: also append plain lines to this file
#![allow(dead_code)]

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use super::log_capture::TestLogCapture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warn,
}

impl Level {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "trace" | "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" | "error" => Some(Self::Warn),
            _ => None,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
        }
    }
}

struct Settings {
    min_level: Level,
    json: bool,
    file: Option<Mutex<std::fs::File>>,
}

fn settings() -> &'static Settings {
    static SETTINGS: OnceLock<Settings> = OnceLock::new();
    SETTINGS.get_or_init(|| {
        let min_level = std::env::var("HEALTHLINK_TEST_LOG")
            .ok()
            .and_then(|raw| Level::parse(&raw))
            .unwrap_or(Level::Info);
        let json = std::env::var("HEALTHLINK_TEST_LOG_JSON")
            .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let file = std::env::var("HEALTHLINK_TEST_LOG_FILE")
            .ok()
            .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok())
            .map(Mutex::new);
        Settings {
            min_level,
            json,
            file,
        }
    })
}

#[derive(Serialize)]
struct Entry<'a> {
    timestamp: String,
    level: Level,
    test: &'a str,
    phase: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
}

/// One logger per test function.
pub struct TestLogger {
    name: String,
    started: Instant,
    phase: Mutex<String>,
}

impl TestLogger {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let logger = Self {
            name: name.to_string(),
            started: Instant::now(),
            phase: Mutex::new("init".to_string()),
        };
        logger.emit(Level::Info, "Test starting", None);
        logger
    }

    /// Logger plus a `tracing` capture scoped to the current thread.
    pub fn with_capture(name: &str) -> (Self, TestLogCapture) {
        let capture = TestLogCapture::start();
        (Self::new(name), capture)
    }

    pub fn phase(&self, phase: &str) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase.to_string();
        }
        self.emit(Level::Debug, &format!("Phase: {phase}"), None);
    }

    pub fn debug(&self, message: &str) {
        self.emit(Level::Debug, message, None);
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message, None);
    }

    pub fn warn(&self, message: &str) {
        self.emit(Level::Warn, message, None);
    }

    pub fn http_request(&self, method: &str, path: &str) {
        self.debug(&format!("HTTP {method} {path}"));
    }

    pub fn finish_ok(&self) {
        let elapsed = self.elapsed_ms();
        self.emit(
            Level::Info,
            &format!("Test passed ({elapsed}ms)"),
            Some(elapsed),
        );
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn emit(&self, level: Level, message: &str, duration_ms: Option<u64>) {
        let settings = settings();
        if level < settings.min_level {
            return;
        }
        let phase = self
            .phase
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();

        let line = if settings.json {
            let entry = Entry {
                timestamp,
                level,
                test: &self.name,
                phase: &phase,
                message,
                duration_ms,
            };
            serde_json::to_string(&entry).unwrap_or_default()
        } else {
            format!(
                "[{timestamp}] [{}] [{}:{phase}] {message}",
                level.label(),
                self.name
            )
        };

        eprintln!("{line}");
        if let Some(file) = &settings.file
            && let Ok(mut file) = file.lock()
        {
            let _ = writeln!(file, "{line}");
        }
    }
}
