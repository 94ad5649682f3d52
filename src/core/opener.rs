//! Hand-off of the authorization URL to the host.

use std::process::{Command, Stdio};
use std::sync::Mutex;

use crate::error::{HealthLinkError, Result};

/// Opens an authorization URL outside this process.
pub trait UrlOpener: Send + Sync {
    /// Start opening `url`. Returns once the request is handed off; does not
    /// wait for the user.
    ///
    /// # Errors
    ///
    /// Returns error if the URL could not be handed off.
    fn open(&self, url: &str) -> Result<()>;
}

/// Launches the platform's default URL handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl SystemOpener {
    /// Program and leading arguments for the current platform.
    #[must_use]
    pub const fn launcher() -> (&'static str, &'static [&'static str]) {
        if cfg!(target_os = "macos") {
            ("open", &[])
        } else if cfg!(target_os = "windows") {
            ("cmd", &["/C", "start", ""])
        } else {
            ("xdg-open", &[])
        }
    }
}

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let (program, args) = Self::launcher();
        let path = which::which(program)
            .map_err(|_| HealthLinkError::Config(format!("no URL opener found ({program} not in PATH)")))?;

        Command::new(path)
            .args(args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        tracing::debug!(program, "Authorization URL handed to system opener");
        Ok(())
    }
}

/// Records URLs instead of opening them.
#[derive(Debug, Default)]
pub struct NoopOpener {
    opened: Mutex<Vec<String>>,
}

impl NoopOpener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs passed to [`UrlOpener::open`] so far.
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_default()
    }
}

impl UrlOpener for NoopOpener {
    fn open(&self, url: &str) -> Result<()> {
        if let Ok(mut urls) = self.opened.lock() {
            urls.push(url.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_records_urls() {
        let opener = NoopOpener::new();
        opener.open("https://a.example").unwrap();
        opener.open("https://b.example").unwrap();
        assert_eq!(opener.opened(), vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn launcher_is_known_program() {
        let (program, _) = SystemOpener::launcher();
        assert!(["open", "cmd", "xdg-open"].contains(&program));
    }
}
