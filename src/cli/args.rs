//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::logging::LogLevel;
use crate::error::{QuotaError, Result};

/// Quota aggregator - query remaining quota for accounts stored in a proxy.
#[derive(Parser, Debug)]
#[command(name = "quota-agg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSON logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Proxy management API base URL
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,
}

impl Cli {
    /// Parsed `--log-level`.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::Config`] for unknown level names.
    pub fn parsed_log_level(&self) -> Result<Option<LogLevel>> {
        self.log_level
            .as_deref()
            .map(|raw| {
                LogLevel::from_arg(raw)
                    .ok_or_else(|| QuotaError::Config(format!("Invalid log level '{raw}'")))
            })
            .transpose()
    }

    /// Timeout given on the active subcommand, if any.
    #[must_use]
    pub fn timeout_override(&self) -> Option<u64> {
        match &self.command {
            Some(Commands::Quota(args)) => args.timeout,
            _ => None,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aggregate quota for every account of one provider
    Quota(QuotaArgs),

    /// List stored credentials known to the proxy
    Accounts(AccountsArgs),
}

/// Arguments for the `quota` command.
#[derive(Parser, Debug)]
pub struct QuotaArgs {
    /// Provider kind (codex, claude, gemini-cli, antigravity, kiro)
    #[arg(long, short = 'p', value_name = "PROVIDER")]
    pub provider: String,

    /// Only query these accounts (by name); repeatable
    #[arg(long = "account", value_name = "NAME")]
    pub accounts: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl QuotaArgs {
    /// Validate argument combinations.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::Config`] for a zero timeout or blank provider.
    pub fn validate(&self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(QuotaError::Config("Provider must not be empty".to_string()));
        }
        if self.timeout == Some(0) {
            return Err(QuotaError::Config(
                "Timeout must be greater than 0 seconds".to_string(),
            ));
        }
        Ok(())
    }
}

/// Arguments for the `accounts` command.
#[derive(Parser, Debug)]
pub struct AccountsArgs {
    /// Only list credentials of this provider kind
    #[arg(long, short = 'p', value_name = "PROVIDER")]
    pub provider: Option<String>,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Colored terminal output
    #[default]
    Human,
    /// Machine-readable JSON
    Json,
}

impl OutputFormat {
    /// Parse from config or env value.
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" | "text" => Some(Self::Human),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quota_command() {
        let cli = Cli::parse_from([
            "quota-agg",
            "quota",
            "--provider",
            "codex",
            "--account",
            "a.json",
            "--account",
            "b.json",
            "--timeout",
            "12",
            "--json",
        ]);
        assert!(cli.json);
        assert_eq!(cli.timeout_override(), Some(12));
        let Some(Commands::Quota(args)) = cli.command else {
            panic!("expected quota command");
        };
        assert_eq!(args.provider, "codex");
        assert_eq!(args.accounts, ["a.json", "b.json"]);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "quota-agg",
            "accounts",
            "--format",
            "json",
            "--base-url",
            "http://proxy:8317",
        ]);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.base_url.as_deref(), Some("http://proxy:8317"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let args = QuotaArgs {
            provider: "codex".to_string(),
            accounts: vec![],
            timeout: Some(0),
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn invalid_log_level_is_config_error() {
        let cli = Cli::parse_from(["quota-agg", "--log-level", "loud"]);
        assert!(matches!(cli.parsed_log_level(), Err(QuotaError::Config(_))));
    }
}
