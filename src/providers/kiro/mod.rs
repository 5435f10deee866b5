//! Kiro simple-usage quota.
//!
//! Kiro usage is not fetched per credential. The backend keeps one snapshot
//! per account and exposes them all through a single aggregate endpoint;
//! snapshots are matched to requested accounts by name.

use std::collections::HashMap;

use serde_json::Value;

use crate::core::credentials::{CredentialRecord, resolve_display_name};
use crate::core::http::KiroQuotaSource;
use crate::core::models::{KiroStatus, KiroUsage, ProviderQuota};
use crate::error::{QuotaError, Result};
use crate::util::normalize::{lookup, normalize_number, normalize_string};

pub const PROVIDER: &str = "kiro";

const EXPIRED_MESSAGE: &str = "token expired";
const FAILED_MESSAGE: &str = "quota query failed";

/// Name a Kiro account is matched on: the record name, else its display name.
#[must_use]
pub fn account_name(record: &CredentialRecord) -> String {
    record.name().unwrap_or_else(|| resolve_display_name(record))
}

/// Parse one backend snapshot. Snapshots without a name are dropped.
#[must_use]
pub fn parse_snapshot(snapshot: &Value) -> Option<KiroUsage> {
    let name = lookup(snapshot, "name").and_then(normalize_string)?;
    let status = match lookup(snapshot, "status")
        .and_then(normalize_string)
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("ok") => KiroStatus::Ok,
        Some("expired") => KiroStatus::Expired,
        _ => KiroStatus::Error,
    };

    Some(KiroUsage {
        name,
        email: lookup(snapshot, "email").and_then(normalize_string),
        current_usage: lookup(snapshot, "current_usage")
            .and_then(normalize_number)
            .unwrap_or(0.0),
        usage_limit: lookup(snapshot, "usage_limit")
            .and_then(normalize_number)
            .unwrap_or(0.0),
        subscription_title: lookup(snapshot, "subscription_title").and_then(normalize_string),
        next_reset: lookup(snapshot, "next_reset").and_then(normalize_string),
        status,
        error_message: lookup(snapshot, "error_message").and_then(normalize_string),
    })
}

/// Index snapshots by name; the first snapshot for a name wins.
#[must_use]
pub fn index_snapshots(snapshots: &[Value]) -> HashMap<String, KiroUsage> {
    let mut index = HashMap::new();
    for usage in snapshots.iter().filter_map(parse_snapshot) {
        index.entry(usage.name.clone()).or_insert(usage);
    }
    index
}

/// Map one account's snapshot (or its absence) to an outcome.
///
/// # Errors
///
/// Returns [`QuotaError::TokenExpired`] for expired snapshots,
/// [`QuotaError::QueryFailed`] for any other non-ok status, and
/// [`QuotaError::NoQuotaInfo`] when there is no snapshot.
pub fn resolve_account(index: &HashMap<String, KiroUsage>, name: &str) -> Result<ProviderQuota> {
    let usage = index
        .get(name)
        .ok_or_else(|| QuotaError::NoQuotaInfo(name.to_string()))?;

    match usage.status {
        KiroStatus::Ok => Ok(ProviderQuota::Kiro(usage.clone())),
        KiroStatus::Expired => Err(QuotaError::TokenExpired {
            account: name.to_string(),
            message: usage
                .error_message
                .clone()
                .unwrap_or_else(|| EXPIRED_MESSAGE.to_string()),
        }),
        KiroStatus::Error => Err(QuotaError::QueryFailed {
            account: name.to_string(),
            message: usage
                .error_message
                .clone()
                .unwrap_or_else(|| FAILED_MESSAGE.to_string()),
        }),
    }
}

/// Fetch the aggregate once and resolve every requested account.
///
/// Outcomes are returned in `records` order. A failed aggregate call fails
/// every account with that call's message.
pub async fn fetch_all(
    source: &dyn KiroQuotaSource,
    records: &[CredentialRecord],
) -> Vec<Result<ProviderQuota>> {
    match source.fetch_snapshots().await {
        Ok(snapshots) => {
            let index = index_snapshots(&snapshots);
            tracing::debug!(
                snapshots = index.len(),
                accounts = records.len(),
                "Fetched Kiro snapshots"
            );
            records
                .iter()
                .map(|record| resolve_account(&index, &account_name(record)))
                .collect()
        }
        Err(err) => {
            let message = err.to_string();
            tracing::warn!(error = %message, "Kiro quota aggregate failed");
            records
                .iter()
                .map(|record| {
                    Err(QuotaError::QueryFailed {
                        account: account_name(record),
                        message: message.clone(),
                    })
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshots() -> Vec<Value> {
        vec![
            json!({
                "name": "kiro-a.json",
                "email": "a@example.com",
                "currentUsage": 120,
                "usageLimit": "500",
                "subscriptionTitle": "KIRO PRO",
                "nextReset": "2026-02-01",
                "status": "ok"
            }),
            json!({"name": "kiro-b.json", "status": "expired"}),
            json!({"name": "kiro-c.json", "status": "error", "errorMessage": "rate limited"}),
            json!({"status": "ok"}),
        ]
    }

    #[test]
    fn ok_snapshot_maps_to_usage() {
        let index = index_snapshots(&snapshots());
        assert_eq!(index.len(), 3);
        let ProviderQuota::Kiro(usage) = resolve_account(&index, "kiro-a.json").unwrap() else {
            panic!("expected kiro data");
        };
        assert!((usage.current_usage - 120.0).abs() < f64::EPSILON);
        assert!((usage.usage_limit - 500.0).abs() < f64::EPSILON);
        assert_eq!(usage.subscription_title.as_deref(), Some("KIRO PRO"));
        assert_eq!(usage.status, KiroStatus::Ok);
    }

    #[test]
    fn expired_and_failed_snapshots_are_errors() {
        let index = index_snapshots(&snapshots());
        let expired = resolve_account(&index, "kiro-b.json").unwrap_err();
        assert!(matches!(expired, QuotaError::TokenExpired { .. }));
        assert_eq!(expired.to_string(), "token expired");

        let failed = resolve_account(&index, "kiro-c.json").unwrap_err();
        assert_eq!(failed.to_string(), "rate limited");
    }

    #[test]
    fn missing_snapshot_reports_no_quota_information() {
        let index = index_snapshots(&snapshots());
        let err = resolve_account(&index, "kiro-z.json").unwrap_err();
        assert!(err.to_string().contains("no quota information found"));
    }

    #[test]
    fn unknown_status_is_error() {
        let usage = parse_snapshot(&json!({"name": "x", "status": "weird"})).unwrap();
        assert_eq!(usage.status, KiroStatus::Error);
        let usage = parse_snapshot(&json!({"name": "x"})).unwrap();
        assert_eq!(usage.status, KiroStatus::Error);
    }

    #[test]
    fn first_snapshot_for_a_name_wins() {
        let index = index_snapshots(&[
            json!({"name": "dup", "status": "ok", "currentUsage": 1}),
            json!({"name": "dup", "status": "error"}),
        ]);
        assert!(resolve_account(&index, "dup").is_ok());
    }
}
