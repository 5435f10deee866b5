//! Normalized quota views and per-account result tracking.
//!
//! Every provider response, whatever its upstream shape, ends up as one of
//! the [`ProviderQuota`] variants. The status/error/data triple of an account
//! is a single [`QuotaStatus`] enum so an error never carries data and a
//! success never carries an error message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderKind;
use crate::error::QuotaError;

/// Fallback message when an error renders as an empty string.
pub const GENERIC_FAILURE: &str = "quota fetch failed";

// =============================================================================
// Windowed-limit view (Codex, Claude)
// =============================================================================

/// One rolling usage window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaWindow {
    pub id: String,
    pub label: String,
    /// Percentage of the window consumed (0-100), `None` when unknown.
    pub used_percent: Option<f64>,
    /// Relative reset label such as `1小时30分后`.
    pub reset_label: String,
}

/// Windowed-limit quota for one account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowedQuota {
    pub plan_type: Option<String>,
    pub windows: Vec<QuotaWindow>,
}

// =============================================================================
// Fractional-bucket view (Gemini CLI)
// =============================================================================

/// Buckets sharing a model family, reduced to the worst remaining fraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketGroup {
    pub id: String,
    pub label: String,
    pub remaining_fraction: Option<f64>,
    pub remaining_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<String>,
    /// Raw model ids that contributed to this group.
    #[serde(default)]
    pub model_ids: Vec<String>,
}

// =============================================================================
// Grouped-model view (Antigravity)
// =============================================================================

/// A named model group matched against the upstream catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelGroup {
    pub id: String,
    pub label: String,
    pub models: Vec<String>,
    pub remaining_fraction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<String>,
}

// =============================================================================
// Simple-usage view (Kiro)
// =============================================================================

/// Snapshot status reported by the backend aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KiroStatus {
    Ok,
    Error,
    Expired,
}

/// Usage numbers for one Kiro account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KiroUsage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub current_usage: f64,
    pub usage_limit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_reset: Option<String>,
    pub status: KiroStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl KiroUsage {
    /// Remaining usage, never negative.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        (self.usage_limit - self.current_usage).max(0.0)
    }
}

// =============================================================================
// Provider Quota (tagged union)
// =============================================================================

/// Normalized quota data, tagged by provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "provider", content = "quota", rename_all = "kebab-case")]
pub enum ProviderQuota {
    Codex(WindowedQuota),
    Claude(WindowedQuota),
    GeminiCli(Vec<BucketGroup>),
    Antigravity(Vec<ModelGroup>),
    Kiro(KiroUsage),
}

impl ProviderQuota {
    /// Provider that produced this data.
    #[must_use]
    pub const fn provider(&self) -> ProviderKind {
        match self {
            Self::Codex(_) => ProviderKind::Codex,
            Self::Claude(_) => ProviderKind::Claude,
            Self::GeminiCli(_) => ProviderKind::GeminiCli,
            Self::Antigravity(_) => ProviderKind::Antigravity,
            Self::Kiro(_) => ProviderKind::Kiro,
        }
    }
}

// =============================================================================
// Account status
// =============================================================================

/// Lifecycle of one account within one aggregation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QuotaStatus {
    #[default]
    Idle,
    Loading,
    Success {
        data: ProviderQuota,
    },
    Error {
        error: String,
    },
}

impl QuotaStatus {
    /// Lowercase status name.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this is `success` or `error`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Error { .. })
    }

    #[must_use]
    pub const fn data(&self) -> Option<&ProviderQuota> {
        match self {
            Self::Success { data } => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error { error } => Some(error),
            _ => None,
        }
    }
}

/// Quota result for one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuotaResult {
    /// Auth index (or name when none resolves); the result key.
    pub account_id: String,
    pub account_name: String,
    #[serde(flatten)]
    pub status: QuotaStatus,
}

impl AccountQuotaResult {
    /// Create an idle result.
    #[must_use]
    pub fn new(account_id: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            account_name: account_name.into(),
            status: QuotaStatus::Idle,
        }
    }

    /// Mark as dispatched. Only an idle result can start loading.
    pub fn begin(&mut self) -> bool {
        if matches!(self.status, QuotaStatus::Idle) {
            self.status = QuotaStatus::Loading;
            true
        } else {
            tracing::warn!(
                account = %self.account_id,
                status = self.status.label(),
                "Ignoring begin on a result that already started"
            );
            false
        }
    }

    /// Record the terminal outcome. A terminal status never changes again.
    pub fn settle(&mut self, outcome: std::result::Result<ProviderQuota, QuotaError>) -> bool {
        if !matches!(self.status, QuotaStatus::Loading) {
            tracing::warn!(
                account = %self.account_id,
                status = self.status.label(),
                "Ignoring settle on a result that is not loading"
            );
            return false;
        }

        self.status = match outcome {
            Ok(data) => QuotaStatus::Success { data },
            Err(err) => QuotaStatus::Error {
                error: failure_message(&err),
            },
        };
        true
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, QuotaStatus::Success { .. })
    }
}

/// Non-empty message for an account-level failure.
#[must_use]
pub fn failure_message(err: &QuotaError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        GENERIC_FAILURE.to_string()
    } else {
        message
    }
}

// =============================================================================
// Aggregation run
// =============================================================================

/// Consolidated output of one aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRun {
    /// Monotonic run id; callers can drop results from superseded runs.
    pub run_id: u64,
    /// Requested provider as given by the caller.
    pub provider: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per requested account, in request order.
    pub results: Vec<AccountQuotaResult>,
}

impl AggregationRun {
    /// Number of accounts that resolved to `success`.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of accounts that resolved to `error`.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.status, QuotaStatus::Error { .. }))
            .count()
    }
}

// =============================================================================
// Robot output envelope
// =============================================================================

/// Stable JSON envelope for machine-readable output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T: Serialize> {
    pub schema_version: &'static str,
    pub command: &'static str,
    pub generated_at: DateTime<Utc>,
    pub data: T,
}

impl<T: Serialize> RobotOutput<T> {
    /// Current schema version.
    pub const SCHEMA_VERSION: &'static str = "quota-agg.v1";

    #[must_use]
    pub fn new(command: &'static str, data: T) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION,
            command,
            generated_at: Utc::now(),
            data,
        }
    }
}
