//! Quota command implementation.

use crate::cli::args::QuotaArgs;
use crate::core::http::{CredentialSource, ManagementClient};
use crate::core::models::AggregationRun;
use crate::core::pipeline::{Aggregator, select_accounts};
use crate::core::provider::ProviderKind;
use crate::error::Result;
use crate::render;
use crate::storage::config::ResolvedConfig;

/// Execute the quota command.
///
/// Per-account failures are part of the rendered output and do not fail
/// the command.
///
/// # Errors
///
/// Returns an error for an unsupported provider, a management API failure
/// while listing credentials, or a rendering failure.
pub async fn execute(args: &QuotaArgs, config: &ResolvedConfig) -> Result<()> {
    args.validate()?;
    let kind = ProviderKind::from_cli_name(&args.provider)?;

    let client = ManagementClient::new(
        &config.base_url,
        config.management_key.clone(),
        config.timeout,
    )?;
    tracing::debug!(base_url = client.base_url(), provider = %kind, "Running quota command");

    let aggregator = Aggregator::from_client(client.clone());
    let run = collect(&client, &aggregator, kind, &args.accounts).await?;

    let output = render::render_quota(&run, config.format, config.pretty, config.no_color)?;
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// List credentials, keep those of `kind`, and aggregate their quota.
///
/// # Errors
///
/// Returns an error only when the credential listing itself fails.
pub async fn collect(
    source: &dyn CredentialSource,
    aggregator: &Aggregator,
    kind: ProviderKind,
    names: &[String],
) -> Result<AggregationRun> {
    let records = source.list_credentials().await?;
    let total = records.len();
    let accounts = select_accounts(records, kind, names);
    tracing::debug!(
        provider = %kind,
        listed = total,
        selected = accounts.len(),
        "Selected accounts"
    );
    Ok(aggregator.aggregate(kind, &accounts).await)
}
