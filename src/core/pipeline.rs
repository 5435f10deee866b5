//! Aggregation orchestrator.
//!
//! Runs one quota fetch per account for a single provider, concurrently,
//! and publishes the consolidated result once every fetch has settled.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use super::credentials::{CredentialRecord, resolve_display_name, result_key};
use super::http::{ApiCallTransport, KiroQuotaSource, ManagementClient};
use super::models::{AccountQuotaResult, AggregationRun, ProviderQuota};
use super::provider::ProviderKind;
use crate::error::{QuotaError, Result};
use crate::providers::{antigravity, claude, codex, gemini_cli, kiro};

// =============================================================================
// Provider selection
// =============================================================================

/// Requested provider, which may be one the engine does not implement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSelector {
    Supported(ProviderKind),
    Unsupported(String),
}

impl ProviderSelector {
    #[must_use]
    pub fn parse(name: &str) -> Self {
        ProviderKind::parse(name).map_or_else(
            || Self::Unsupported(name.trim().to_string()),
            Self::Supported,
        )
    }

    /// Name as given, or the CLI name for supported kinds.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Supported(kind) => kind.cli_name(),
            Self::Unsupported(name) => name,
        }
    }
}

impl From<&str> for ProviderSelector {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl From<ProviderKind> for ProviderSelector {
    fn from(kind: ProviderKind) -> Self {
        Self::Supported(kind)
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// Dispatches quota fetches and tracks per-account status.
pub struct Aggregator {
    transport: Arc<dyn ApiCallTransport>,
    kiro_source: Arc<dyn KiroQuotaSource>,
    next_run_id: AtomicU64,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("next_run_id", &self.next_run_id)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    #[must_use]
    pub fn new(
        transport: Arc<dyn ApiCallTransport>,
        kiro_source: Arc<dyn KiroQuotaSource>,
    ) -> Self {
        Self {
            transport,
            kiro_source,
            next_run_id: AtomicU64::new(1),
        }
    }

    /// Aggregator backed by one management client for both collaborators.
    #[must_use]
    pub fn from_client(client: ManagementClient) -> Self {
        let client = Arc::new(client);
        Self::new(client.clone(), client)
    }

    /// Run one aggregation.
    ///
    /// Every account gets exactly one result, in input order. Failures stay
    /// with their account. An empty account list makes no calls.
    pub async fn aggregate(
        &self,
        provider: impl Into<ProviderSelector>,
        accounts: &[CredentialRecord],
    ) -> AggregationRun {
        let selector = provider.into();
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let started_at = Utc::now();

        let mut results: Vec<AccountQuotaResult> = accounts
            .iter()
            .map(|record| AccountQuotaResult::new(result_key(record), resolve_display_name(record)))
            .collect();

        if accounts.is_empty() {
            tracing::debug!(run_id, provider = selector.name(), "No accounts to aggregate");
            return AggregationRun {
                run_id,
                provider: selector.name().to_string(),
                started_at,
                finished_at: Utc::now(),
                results,
            };
        }

        tracing::info!(
            run_id,
            provider = selector.name(),
            accounts = accounts.len(),
            "Starting quota aggregation"
        );

        for result in &mut results {
            result.begin();
        }

        let outcomes: Vec<Result<ProviderQuota>> = match &selector {
            ProviderSelector::Unsupported(name) => {
                tracing::warn!(run_id, provider = %name, "Unsupported provider");
                accounts
                    .iter()
                    .map(|_| Err(QuotaError::UnsupportedProvider(name.clone())))
                    .collect()
            }
            ProviderSelector::Supported(ProviderKind::Kiro) => {
                kiro::fetch_all(self.kiro_source.as_ref(), accounts).await
            }
            ProviderSelector::Supported(kind) => {
                let futures: Vec<_> = accounts
                    .iter()
                    .map(|record| self.fetch_account(*kind, record))
                    .collect();
                futures::future::join_all(futures).await
            }
        };

        for (result, outcome) in results.iter_mut().zip(outcomes) {
            match &outcome {
                Ok(_) => tracing::debug!(run_id, account = %result.account_id, "Account succeeded"),
                Err(e) => tracing::debug!(
                    run_id,
                    account = %result.account_id,
                    code = e.error_code(),
                    error = %e,
                    "Account failed"
                ),
            }
            result.settle(outcome);
        }

        let run = AggregationRun {
            run_id,
            provider: selector.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            results,
        };

        tracing::info!(
            run_id,
            provider = %run.provider,
            succeeded = run.succeeded(),
            failed = run.failed(),
            duration_ms = (run.finished_at - run.started_at).num_milliseconds(),
            "Quota aggregation finished"
        );
        run
    }

    /// Fetch quota for a single account.
    ///
    /// A Kiro account still goes through the backend aggregate, one call for
    /// this account alone.
    ///
    /// # Errors
    ///
    /// Returns the provider's error for this account.
    pub async fn fetch_account(
        &self,
        kind: ProviderKind,
        record: &CredentialRecord,
    ) -> Result<ProviderQuota> {
        let transport = self.transport.as_ref();
        match kind {
            ProviderKind::Codex => codex::fetch_quota(transport, record).await,
            ProviderKind::Claude => claude::fetch_quota(transport, record).await,
            ProviderKind::GeminiCli => gemini_cli::fetch_quota(transport, record).await,
            ProviderKind::Antigravity => antigravity::fetch_quota(transport, record).await,
            ProviderKind::Kiro => kiro::fetch_all(
                self.kiro_source.as_ref(),
                std::slice::from_ref(record),
            )
            .await
            .pop()
            .unwrap_or_else(|| Err(QuotaError::NoQuotaInfo(kiro::account_name(record)))),
        }
    }
}

/// Keep only records that belong to `kind`, optionally narrowed to names.
#[must_use]
pub fn select_accounts(
    records: Vec<CredentialRecord>,
    kind: ProviderKind,
    names: &[String],
) -> Vec<CredentialRecord> {
    records
        .into_iter()
        .filter(|r| r.belongs_to(kind))
        .filter(|r| {
            names.is_empty()
                || names.iter().any(|n| {
                    r.name().as_deref() == Some(n.as_str()) || resolve_display_name(r) == *n
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        ScriptedTransport, StaticKiroSource, make_codex_record, make_codex_usage_body,
    };
    use serde_json::json;
    use tracing_test::traced_test;

    fn record(value: serde_json::Value) -> CredentialRecord {
        CredentialRecord::from_value(value).unwrap()
    }

    #[test]
    fn selector_parses_known_and_unknown() {
        assert_eq!(
            ProviderSelector::parse("gemini"),
            ProviderSelector::Supported(ProviderKind::GeminiCli)
        );
        let unknown = ProviderSelector::parse(" qwen ");
        assert_eq!(unknown, ProviderSelector::Unsupported("qwen".to_string()));
        assert_eq!(unknown.name(), "qwen");
    }

    #[test]
    fn select_accounts_filters_by_type_and_name() {
        let records = vec![
            record(json!({"name": "codex-a.json", "type": "codex"})),
            record(json!({"name": "codex-b.json", "type": "codex"})),
            record(json!({"name": "kiro-a.json", "type": "kiro"})),
        ];
        let all = select_accounts(records.clone(), ProviderKind::Codex, &[]);
        assert_eq!(all.len(), 2);

        let one = select_accounts(records, ProviderKind::Codex, &["codex-b.json".to_string()]);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].name().as_deref(), Some("codex-b.json"));
    }

    fn codex_aggregator() -> Aggregator {
        let transport = ScriptedTransport::new()
            .respond_for_index("idx-a", 200, &make_codex_usage_body(10.0, 20.0))
            .fail_for_index("idx-b", "connection reset");
        Aggregator::new(Arc::new(transport), Arc::new(StaticKiroSource::new(vec![])))
    }

    #[test]
    fn run_ids_increase_per_aggregation() {
        let aggregator = codex_aggregator();
        let first = tokio_test::block_on(aggregator.aggregate(ProviderKind::Codex, &[]));
        let second = tokio_test::block_on(aggregator.aggregate(ProviderKind::Codex, &[]));
        assert_eq!(first.run_id, 1);
        assert_eq!(second.run_id, 2);
        assert!(second.results.is_empty());
    }

    #[test]
    #[traced_test]
    fn aggregation_logs_start_and_each_failure() {
        let accounts = vec![
            make_codex_record("a.json", "idx-a", "acct-a"),
            make_codex_record("b.json", "idx-b", "acct-b"),
        ];
        let run = tokio_test::block_on(codex_aggregator().aggregate(ProviderKind::Codex, &accounts));

        assert_eq!(run.succeeded(), 1);
        assert_eq!(run.failed(), 1);
        assert!(logs_contain("Starting quota aggregation"));
        assert!(logs_contain("Account failed"));
        assert!(logs_contain("connection reset"));
        assert!(logs_contain("Quota aggregation finished"));
    }
}
