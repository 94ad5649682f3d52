//! Storage for configuration and the signed-in user session.

pub mod config;
pub mod paths;
pub mod session;

pub use config::{
    Config, ConfigSource, ConfigSources, ENV_API_KEY, ENV_BACKEND_URL, ENV_CONFIG, ENV_FORMAT,
    ENV_NO_COLOR, ENV_NO_COLOR_STD, ENV_PRETTY, ENV_TIMEOUT, ENV_VERBOSE, ResolvedConfig,
};
pub use paths::AppPaths;
pub use session::{
    ENV_ACCESS_TOKEN, ENV_USER_ID, KeyringStore, MemoryStore, SessionStore, resolve_session,
};
