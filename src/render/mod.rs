//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use crate::cli::args::OutputFormat;
use crate::core::credentials::CredentialRecord;
use crate::core::models::AggregationRun;
use crate::error::Result;

/// Render a quota aggregation run.
pub fn render_quota(
    run: &AggregationRun,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_quota(run, no_color),
        OutputFormat::Json => robot::render_quota_json(run, pretty),
    }
}

/// Render the stored credential list.
pub fn render_accounts(
    records: &[CredentialRecord],
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_accounts(records, no_color),
        OutputFormat::Json => robot::render_accounts_json(records, pretty),
    }
}
