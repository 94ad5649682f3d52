//! Application paths.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Application directories.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
}

impl AppPaths {
    /// Resolve paths for the healthlink application.
    #[must_use]
    pub fn new() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "healthlink") {
            Self {
                config: proj_dirs.config_dir().to_path_buf(),
            }
        } else {
            let home = BaseDirs::new().map_or_else(|| PathBuf::from("."), |b| b.home_dir().to_path_buf());
            Self {
                config: home.join(".config/healthlink"),
            }
        }
    }

    /// Path to the configuration file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
