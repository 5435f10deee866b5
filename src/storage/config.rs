//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux: `~/.config/quota-agg/config.toml`
//! - macOS: `~/Library/Application Support/dev.quota-agg.quota-agg/config.toml`
//! - Windows: `%APPDATA%/quota-agg/quota-agg/config/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `QUOTA_AGG_BASE_URL`: Proxy management API base URL
//! - `QUOTA_AGG_MANAGEMENT_KEY`: Management API key
//! - `QUOTA_AGG_TIMEOUT`: Request timeout in seconds
//! - `QUOTA_AGG_FORMAT`: Output format (human, json)
//! - `NO_COLOR`: Disable colors
//! - `QUOTA_AGG_CONFIG`: Override config file path

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::{Cli, OutputFormat};
use crate::error::{QuotaError, Result};
use crate::util::env::env_non_empty;

// =============================================================================
// Environment Variable Names
// =============================================================================

pub const ENV_BASE_URL: &str = "QUOTA_AGG_BASE_URL";
pub const ENV_MANAGEMENT_KEY: &str = "QUOTA_AGG_MANAGEMENT_KEY";
pub const ENV_TIMEOUT: &str = "QUOTA_AGG_TIMEOUT";
pub const ENV_FORMAT: &str = "QUOTA_AGG_FORMAT";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR: &str = "NO_COLOR";
pub const ENV_CONFIG: &str = "QUOTA_AGG_CONFIG";

/// Default management API address of a locally running proxy.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8317";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Final configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub management_key: Option<String>,
    pub timeout: Duration,
    pub format: OutputFormat,
    pub pretty: bool,
    pub no_color: bool,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub base_url: ConfigSource,
    pub management_key: ConfigSource,
    pub timeout: ConfigSource,
    pub format: ConfigSource,
    pub pretty: ConfigSource,
    pub no_color: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    Env,
    ConfigFile,
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve from CLI args, environment variables, and the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid, or any
    /// resolved value is invalid.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config = Self::load_config()?;
        Self::resolve_with(cli, &config)
    }

    /// Resolve against an already loaded config file.
    ///
    /// # Errors
    ///
    /// Returns an error if any resolved value is invalid.
    pub fn resolve_with(cli: &Cli, config: &Config) -> Result<Self> {
        config.validate()?;
        let mut sources = ConfigSources::default();

        let base_url = Self::resolve_base_url(cli, config, &mut sources.base_url);
        let management_key = Self::resolve_management_key(config, &mut sources.management_key);
        let timeout = Self::resolve_timeout(cli, config, &mut sources.timeout)?;
        let format = Self::resolve_format(cli, config, &mut sources.format)?;
        let pretty = Self::resolve_pretty(cli, config, &mut sources.pretty);
        let no_color = Self::resolve_no_color(cli, config, &mut sources.no_color);

        if base_url.trim().is_empty() {
            return Err(QuotaError::Config(format!(
                "Management base URL is empty (from {})",
                sources.base_url
            )));
        }

        Ok(Self {
            base_url,
            management_key,
            timeout,
            format,
            pretty,
            no_color,
            sources,
        })
    }

    /// Load config file, respecting the `QUOTA_AGG_CONFIG` override.
    fn load_config() -> Result<Config> {
        match env_non_empty(ENV_CONFIG) {
            Some(path) => Config::load_from(Path::new(&path)),
            None => Config::load(),
        }
    }

    fn resolve_base_url(cli: &Cli, config: &Config, source: &mut ConfigSource) -> String {
        if let Some(url) = cli.base_url.as_deref().map(str::trim) {
            *source = ConfigSource::Cli;
            return url.to_string();
        }
        if let Some(url) = env_non_empty(ENV_BASE_URL) {
            *source = ConfigSource::Env;
            return url;
        }
        if let Some(url) = config.management.base_url.as_deref() {
            *source = ConfigSource::ConfigFile;
            return url.trim().to_string();
        }
        *source = ConfigSource::Default;
        DEFAULT_BASE_URL.to_string()
    }

    fn resolve_management_key(config: &Config, source: &mut ConfigSource) -> Option<String> {
        if let Some(key) = env_non_empty(ENV_MANAGEMENT_KEY) {
            *source = ConfigSource::Env;
            return Some(key);
        }
        if let Some(key) = config
            .management
            .key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
        {
            *source = ConfigSource::ConfigFile;
            return Some(key.to_string());
        }
        *source = ConfigSource::Default;
        None
    }

    fn resolve_timeout(cli: &Cli, config: &Config, source: &mut ConfigSource) -> Result<Duration> {
        let (seconds, from) = if let Some(secs) = cli.timeout_override() {
            (secs, ConfigSource::Cli)
        } else if let Some(raw) = env_non_empty(ENV_TIMEOUT) {
            let secs = raw.parse::<u64>().map_err(|_| {
                QuotaError::Config(format!("Invalid {ENV_TIMEOUT} value '{raw}'"))
            })?;
            (secs, ConfigSource::Env)
        } else if let Some(secs) = config.management.timeout_seconds {
            (secs, ConfigSource::ConfigFile)
        } else {
            (DEFAULT_TIMEOUT_SECS, ConfigSource::Default)
        };

        if seconds == 0 {
            return Err(QuotaError::Config(format!(
                "Timeout must be greater than 0 seconds (from {from})"
            )));
        }
        *source = from;
        Ok(Duration::from_secs(seconds))
    }

    fn resolve_format(
        cli: &Cli,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Result<OutputFormat> {
        if cli.json {
            *source = ConfigSource::Cli;
            return Ok(OutputFormat::Json);
        }
        if let Some(format) = cli.format {
            *source = ConfigSource::Cli;
            return Ok(format);
        }
        if let Some(raw) = env_non_empty(ENV_FORMAT) {
            *source = ConfigSource::Env;
            return parse_format(&raw);
        }
        if let Some(raw) = config.output.format.as_deref() {
            *source = ConfigSource::ConfigFile;
            return parse_format(raw);
        }
        *source = ConfigSource::Default;
        Ok(OutputFormat::Human)
    }

    fn resolve_pretty(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        if cli.pretty {
            *source = ConfigSource::Cli;
            return true;
        }
        if config.output.pretty {
            *source = ConfigSource::ConfigFile;
            return true;
        }
        *source = ConfigSource::Default;
        false
    }

    fn resolve_no_color(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        if cli.no_color {
            *source = ConfigSource::Cli;
            return true;
        }
        if std::env::var_os(ENV_NO_COLOR).is_some() {
            *source = ConfigSource::Env;
            return true;
        }
        if !config.output.color {
            *source = ConfigSource::ConfigFile;
            return true;
        }
        *source = ConfigSource::Default;
        false
    }
}

fn parse_format(raw: &str) -> Result<OutputFormat> {
    OutputFormat::from_arg(raw).ok_or_else(|| {
        QuotaError::Config(format!("Invalid format '{raw}'. Valid formats: human, json"))
    })
}

// =============================================================================
// Config File
// =============================================================================

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub management: ManagementConfig,
    pub output: OutputConfig,
}

/// `[management]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    /// Proxy management API base URL.
    pub base_url: Option<String>,
    /// Management API key.
    pub key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: Option<u64>,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (human, json).
    pub format: Option<String>,
    pub color: bool,
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            pretty: false,
        }
    }
}

impl Config {
    /// Load from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().config_file())
    }

    /// Load from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| QuotaError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a specific path, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or writing fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| QuotaError::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content)?;
        tracing::debug!(?path, "Config file saved");
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::Config`] for an empty or non-HTTP base URL, an
    /// unknown output format, or a timeout outside 1-300 seconds.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.management.base_url {
            let url = url.trim();
            if url.is_empty() {
                return Err(QuotaError::Config("base_url must not be empty".to_string()));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(QuotaError::Config(format!(
                    "base_url \"{url}\" must start with http:// or https://"
                )));
            }
        }

        if let Some(format) = &self.output.format {
            if OutputFormat::from_arg(format).is_none() {
                return Err(QuotaError::Config(format!(
                    "Invalid format \"{format}\". Valid formats: human, json"
                )));
            }
        }

        if let Some(secs) = self.management.timeout_seconds {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(QuotaError::Config(format!(
                    "Timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds"
                )));
            }
        }

        Ok(())
    }
}
