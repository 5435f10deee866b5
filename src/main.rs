//! quota-agg - Multi-provider quota aggregation
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use quota_agg::cli::{Cli, Commands, OutputFormat};
use quota_agg::core::logging::{self, LogSettings};
use quota_agg::render::error::render_error;
use quota_agg::storage::config::ResolvedConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Until config resolves, errors render per the CLI flags alone.
    let fallback_format = if cli.json {
        OutputFormat::Json
    } else {
        cli.format.unwrap_or_default()
    };

    let log_level = match cli.parsed_log_level() {
        Ok(level) => level,
        Err(e) => return fail(&e, fallback_format, cli.no_color, cli.pretty),
    };
    logging::init(&LogSettings::resolve(log_level, cli.json_output, cli.verbose));

    let mut config = match ResolvedConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => return fail(&e, fallback_format, cli.no_color, cli.pretty),
    };
    config.no_color = config.no_color || !quota_agg::util::env::should_use_color(false);
    tracing::debug!(
        base_url = %config.base_url,
        base_url_source = %config.sources.base_url,
        timeout_secs = config.timeout.as_secs(),
        "Resolved configuration"
    );

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e, config.format, config.no_color, config.pretty),
    }
}

async fn run(cli: Cli, config: &ResolvedConfig) -> quota_agg::Result<()> {
    match cli.command {
        None => {
            print_quickstart();
            Ok(())
        }
        Some(Commands::Quota(args)) => quota_agg::cli::quota::execute(&args, config).await,
        Some(Commands::Accounts(args)) => quota_agg::cli::accounts::execute(&args, config).await,
    }
}

fn fail(
    error: &quota_agg::QuotaError,
    format: OutputFormat,
    no_color: bool,
    pretty: bool,
) -> ExitCode {
    tracing::error!(code = error.error_code(), "{error}");
    eprintln!("{}", render_error(error, format, no_color, pretty));
    ExitCode::from(error.exit_code() as u8)
}

/// Print quickstart help when no command is given.
fn print_quickstart() {
    println!(
        r"quota-agg - Multi-provider quota aggregation

Query remaining quota for the credentials stored in an AI proxy.

USAGE:
    quota-agg [OPTIONS] <COMMAND>

COMMANDS:
    quota     Aggregate quota for every account of one provider
    accounts  List stored credentials

QUICK START:
    quota-agg accounts                        # What does the proxy hold?
    quota-agg quota --provider codex          # Codex windows per account
    quota-agg quota -p kiro --json            # JSON output
    quota-agg quota -p antigravity --account a.json

For more help: quota-agg --help
"
    );
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
}
