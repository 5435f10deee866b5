//! Accounts command implementation.

use crate::cli::args::AccountsArgs;
use crate::core::http::{CredentialSource, ManagementClient};
use crate::core::provider::ProviderKind;
use crate::error::Result;
use crate::render;
use crate::storage::config::ResolvedConfig;

/// Execute the accounts command.
///
/// # Errors
///
/// Returns an error for an unsupported provider filter or a management API
/// failure.
pub async fn execute(args: &AccountsArgs, config: &ResolvedConfig) -> Result<()> {
    let kind = args
        .provider
        .as_deref()
        .map(ProviderKind::from_cli_name)
        .transpose()?;

    let client = ManagementClient::new(
        &config.base_url,
        config.management_key.clone(),
        config.timeout,
    )?;
    let mut records = client.list_credentials().await?;
    if let Some(kind) = kind {
        records.retain(|r| r.belongs_to(kind));
    }
    tracing::debug!(count = records.len(), "Listed credentials");

    let output = render::render_accounts(&records, config.format, config.pretty, config.no_color)?;
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
