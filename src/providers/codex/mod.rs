//! Codex (ChatGPT) windowed-limit quota.
//!
//! Calls the ChatGPT usage endpoint on behalf of a stored Codex credential
//! and turns its rate-limit objects into up to three windows:
//! - `rate_limit.primary_window`: the 5-hour window
//! - `rate_limit.secondary_window`: the weekly window
//! - `code_review_rate_limit.primary_window`: the code-review window
//!
//! The request needs both the auth index and the ChatGPT account id; the
//! latter is usually only present inside the credential's `id_token`.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::core::credentials::{
    CredentialRecord, canonicalize_plan_type, resolve_account_id, resolve_auth_index,
    resolve_plan_type,
};
use crate::core::http::{ApiCallRequest, ApiCallTransport};
use crate::core::models::{ProviderQuota, QuotaWindow, WindowedQuota};
use crate::error::{QuotaError, Result};
use crate::util::normalize::{lookup, normalize_bool, normalize_number, normalize_string};
use crate::util::time::{format_reset_label_at, parse_timestamp};

/// Provider name used in errors and logs.
pub const PROVIDER: &str = "codex";

/// ChatGPT usage endpoint.
pub const USAGE_URL: &str = "https://chatgpt.com/backend-api/wham/usage";

/// Header carrying the ChatGPT account id.
pub const ACCOUNT_HEADER: &str = "Chatgpt-Account-Id";

/// (parent key, window key, window id, label)
const WINDOWS: [(&str, &str, &str, &str); 3] = [
    ("rate_limit", "primary_window", "five-hour", "5小时限额"),
    ("rate_limit", "secondary_window", "weekly", "周限额"),
    (
        "code_review_rate_limit",
        "primary_window",
        "code-review",
        "代码审查限额",
    ),
];

// =============================================================================
// Request
// =============================================================================

/// Build the usage request, failing before any call when inputs are missing.
///
/// # Errors
///
/// Returns [`QuotaError::MissingInput`] naming `auth_index` or
/// `chatgpt_account_id`.
pub fn build_request(record: &CredentialRecord) -> Result<ApiCallRequest> {
    let auth_index =
        resolve_auth_index(record).ok_or_else(|| QuotaError::missing(PROVIDER, "auth_index"))?;
    let account_id = resolve_account_id(record)
        .ok_or_else(|| QuotaError::missing(PROVIDER, "chatgpt_account_id"))?;

    Ok(ApiCallRequest::get(auth_index, USAGE_URL)
        .with_default_headers()
        .header(ACCOUNT_HEADER, account_id))
}

/// Fetch and parse quota for one Codex credential.
///
/// # Errors
///
/// Returns error on missing inputs, transport failure, non-2xx status, or
/// a body without any rate-limit window.
pub async fn fetch_quota(
    transport: &dyn ApiCallTransport,
    record: &CredentialRecord,
) -> Result<ProviderQuota> {
    let request = build_request(record)?;
    let response = transport.call(request).await?;
    response.ensure_success(PROVIDER)?;
    let body = response.json(PROVIDER)?;

    let quota = parse_usage(&body, resolve_plan_type(record), Utc::now())?;
    tracing::debug!(
        plan = ?quota.plan_type,
        windows = quota.windows.len(),
        "Parsed Codex usage"
    );
    Ok(ProviderQuota::Codex(quota))
}

// =============================================================================
// Parsing
// =============================================================================

/// Turn a usage body into the windowed view.
///
/// `fallback_plan` is the plan resolved from the credential, used when the
/// body does not name one.
///
/// # Errors
///
/// Returns [`QuotaError::EmptyPayload`] when no window is present.
pub fn parse_usage(
    body: &Value,
    fallback_plan: Option<String>,
    now: DateTime<Utc>,
) -> Result<WindowedQuota> {
    let windows: Vec<QuotaWindow> = WINDOWS
        .iter()
        .filter_map(|(parent_key, window_key, id, label)| {
            let parent = lookup(body, parent_key)?;
            let window = lookup(parent, window_key).filter(|w| w.is_object())?;
            Some(QuotaWindow {
                id: (*id).to_string(),
                label: (*label).to_string(),
                used_percent: used_percent(window, parent),
                reset_label: format_reset_label_at(reset_time(window, now), now),
            })
        })
        .collect();

    if windows.is_empty() {
        return Err(QuotaError::empty(PROVIDER, "no rate limit windows"));
    }

    let plan_type = lookup(body, "plan_type")
        .and_then(normalize_string)
        .and_then(|p| canonicalize_plan_type(&p))
        .or(fallback_plan);

    Ok(WindowedQuota { plan_type, windows })
}

/// Used percentage; a reached limit without a percentage reads as 100.
fn used_percent(window: &Value, parent: &Value) -> Option<f64> {
    lookup(window, "used_percent")
        .and_then(normalize_number)
        .or_else(|| (limit_reached(window) || limit_reached(parent)).then_some(100.0))
}

fn limit_reached(object: &Value) -> bool {
    lookup(object, "limit_reached").and_then(normalize_bool) == Some(true)
        || lookup(object, "allowed").and_then(normalize_bool) == Some(false)
}

fn reset_time(window: &Value, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    lookup(window, "reset_at")
        .and_then(parse_timestamp)
        .or_else(|| {
            let seconds = lookup(window, "reset_after_seconds").and_then(normalize_number)?;
            #[allow(clippy::cast_possible_truncation)]
            let seconds = seconds.round() as i64;
            Duration::try_seconds(seconds).and_then(|d| now.checked_add_signed(d))
        })
}
