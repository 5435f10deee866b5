//! Storage for configuration.

pub mod config;
pub mod paths;

pub use config::{
    Config, ConfigSource, ConfigSources, DEFAULT_BASE_URL, ENV_BASE_URL, ENV_CONFIG, ENV_FORMAT,
    ENV_MANAGEMENT_KEY, ENV_NO_COLOR, ENV_TIMEOUT, ResolvedConfig,
};
pub use paths::AppPaths;
