//! Robot-mode output (JSON).
//!
//! Provides stable output for scripts and agents, wrapped in
//! [`RobotOutput`].

use serde::Serialize;

use crate::core::credentials::{CredentialRecord, resolve_auth_index, resolve_display_name};
use crate::core::models::{AggregationRun, RobotOutput};
use crate::error::Result;

/// Render any serializable value as JSON.
pub fn render_json<T: Serialize>(output: &T, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(output)?)
    } else {
        Ok(serde_json::to_string(output)?)
    }
}

/// Render an aggregation run as JSON.
pub fn render_quota_json(run: &AggregationRun, pretty: bool) -> Result<String> {
    render_json(&RobotOutput::new("quota", run), pretty)
}

/// Summary of one stored credential.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub display_name: String,
    pub auth_index: Option<String>,
}

impl From<&CredentialRecord> for AccountSummary {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            name: record.name(),
            provider: record.credential_type(),
            display_name: resolve_display_name(record),
            auth_index: resolve_auth_index(record),
        }
    }
}

/// Render the credential list as JSON.
pub fn render_accounts_json(records: &[CredentialRecord], pretty: bool) -> Result<String> {
    let summaries: Vec<AccountSummary> = records.iter().map(AccountSummary::from).collect();
    render_json(&RobotOutput::new("accounts", summaries), pretty)
}
