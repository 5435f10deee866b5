//! Claude (Anthropic) windowed-limit quota.
//!
//! Uses the OAuth usage endpoint, relayed for a stored Claude credential.
//! Each window object carries a `utilization` percentage and a `resets_at`
//! timestamp; windows the account does not have come back as `null`.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::credentials::{CredentialRecord, resolve_auth_index, resolve_plan_type};
use crate::core::http::{ApiCallRequest, ApiCallTransport};
use crate::core::models::{ProviderQuota, QuotaWindow, WindowedQuota};
use crate::error::{QuotaError, Result};
use crate::util::normalize::{lookup, normalize_number};
use crate::util::time::{format_reset_label_at, parse_timestamp};

pub const PROVIDER: &str = "claude";

/// Anthropic OAuth usage endpoint.
pub const USAGE_URL: &str = "https://api.anthropic.com/api/oauth/usage";

/// Beta flag the OAuth usage endpoint requires.
pub const OAUTH_BETA: &str = "oauth-2025-04-20";

/// (body key, window id, label)
const WINDOWS: [(&str, &str, &str); 4] = [
    ("five_hour", "five-hour", "5小时限额"),
    ("seven_day", "seven-day", "7天限额"),
    ("seven_day_opus", "seven-day-opus", "7天 Opus 限额"),
    ("seven_day_sonnet", "seven-day-sonnet", "7天 Sonnet 限额"),
];

/// Build the usage request.
///
/// # Errors
///
/// Returns [`QuotaError::MissingInput`] when no auth index resolves.
pub fn build_request(record: &CredentialRecord) -> Result<ApiCallRequest> {
    let auth_index =
        resolve_auth_index(record).ok_or_else(|| QuotaError::missing(PROVIDER, "auth_index"))?;
    Ok(ApiCallRequest::get(auth_index, USAGE_URL)
        .with_default_headers()
        .header("anthropic-beta", OAUTH_BETA))
}

/// Fetch and parse quota for one Claude credential.
///
/// # Errors
///
/// Returns error on missing inputs, transport failure, non-2xx status, or a
/// body without any window.
pub async fn fetch_quota(
    transport: &dyn ApiCallTransport,
    record: &CredentialRecord,
) -> Result<ProviderQuota> {
    let request = build_request(record)?;
    let response = transport.call(request).await?;
    response.ensure_success(PROVIDER)?;
    let body = response.json(PROVIDER)?;
    let quota = parse_usage(&body, resolve_plan_type(record), Utc::now())?;
    Ok(ProviderQuota::Claude(quota))
}

/// Turn an OAuth usage body into the windowed view.
///
/// # Errors
///
/// Returns [`QuotaError::EmptyPayload`] when every window is absent.
pub fn parse_usage(
    body: &Value,
    plan_type: Option<String>,
    now: DateTime<Utc>,
) -> Result<WindowedQuota> {
    let windows: Vec<QuotaWindow> = WINDOWS
        .iter()
        .filter_map(|(key, id, label)| {
            let window = lookup(body, key).filter(|w| w.is_object())?;
            Some(QuotaWindow {
                id: (*id).to_string(),
                label: (*label).to_string(),
                used_percent: lookup(window, "utilization").and_then(normalize_number),
                reset_label: format_reset_label_at(
                    lookup(window, "resets_at").and_then(parse_timestamp),
                    now,
                ),
            })
        })
        .collect();

    if windows.is_empty() {
        return Err(QuotaError::empty(PROVIDER, "no usage windows"));
    }
    Ok(WindowedQuota { plan_type, windows })
}
