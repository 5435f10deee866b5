//! Gemini CLI fractional-bucket quota.
//!
//! `retrieveUserQuota` returns one bucket per model (and token type) with a
//! remaining fraction. Buckets are grouped into model families and each
//! family reports its worst bucket.

use serde_json::{Value, json};

use crate::core::credentials::{CredentialRecord, resolve_auth_index, resolve_project_id};
use crate::core::http::{ApiCallRequest, ApiCallTransport};
use crate::core::models::{BucketGroup, ProviderQuota};
use crate::error::{QuotaError, Result};
use crate::util::normalize::{lookup, normalize_number, normalize_string};

pub const PROVIDER: &str = "gemini-cli";

/// Code Assist quota endpoint.
pub const QUOTA_URL: &str = "https://cloudcode-pa.googleapis.com/v1internal:retrieveUserQuota";

/// Build the quota request.
///
/// # Errors
///
/// Returns [`QuotaError::MissingInput`] naming `auth_index` or `project_id`.
pub fn build_request(record: &CredentialRecord) -> Result<ApiCallRequest> {
    let auth_index =
        resolve_auth_index(record).ok_or_else(|| QuotaError::missing(PROVIDER, "auth_index"))?;
    let project_id =
        resolve_project_id(record).ok_or_else(|| QuotaError::missing(PROVIDER, "project_id"))?;
    Ok(ApiCallRequest::post(auth_index, QUOTA_URL, &json!({ "project": project_id }))
        .with_default_headers())
}

/// Fetch and group quota buckets for one Gemini CLI credential.
///
/// # Errors
///
/// Returns error on missing inputs, transport failure, non-2xx status, or a
/// body without a `buckets` array.
pub async fn fetch_quota(
    transport: &dyn ApiCallTransport,
    record: &CredentialRecord,
) -> Result<ProviderQuota> {
    let request = build_request(record)?;
    let response = transport.call(request).await?;
    response.ensure_success(PROVIDER)?;
    let body = response.json(PROVIDER)?;
    let groups = parse_buckets(&body)?;
    tracing::debug!(groups = groups.len(), "Parsed Gemini CLI buckets");
    Ok(ProviderQuota::GeminiCli(groups))
}

/// Model family for a raw model id: `(group id, label)`.
#[must_use]
pub fn family_of(model_id: &str) -> (String, String) {
    let lower = model_id.to_lowercase();
    if lower.contains("flash") {
        ("gemini-flash-series".to_string(), "Gemini Flash 系列".to_string())
    } else if lower.contains("pro") {
        ("gemini-pro-series".to_string(), "Gemini Pro 系列".to_string())
    } else {
        (model_id.to_string(), model_id.to_string())
    }
}

/// Group raw buckets by family, keeping the minimum remaining fraction.
///
/// Ties keep the first-seen bucket. Groups come out in first-seen order.
///
/// # Errors
///
/// Returns [`QuotaError::EmptyPayload`] when `buckets` is missing.
pub fn parse_buckets(body: &Value) -> Result<Vec<BucketGroup>> {
    let buckets = lookup(body, "buckets")
        .and_then(Value::as_array)
        .ok_or_else(|| QuotaError::empty(PROVIDER, "missing buckets"))?;

    let mut groups: Vec<BucketGroup> = Vec::new();
    for bucket in buckets {
        let Some(model_id) = lookup(bucket, "model_id").and_then(normalize_string) else {
            continue;
        };
        let fraction = lookup(bucket, "remaining_fraction").and_then(normalize_number);
        let amount = lookup(bucket, "remaining_amount").and_then(normalize_number);
        let reset_time = lookup(bucket, "reset_time").and_then(normalize_string);
        let (id, label) = family_of(&model_id);

        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => {
                let lower = match (fraction, group.remaining_fraction) {
                    (Some(new), Some(current)) => new < current,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if lower {
                    group.remaining_fraction = fraction;
                    group.remaining_amount = amount;
                    group.reset_time = reset_time;
                }
                if !group.model_ids.contains(&model_id) {
                    group.model_ids.push(model_id);
                }
            }
            None => groups.push(BucketGroup {
                id,
                label,
                remaining_fraction: fraction,
                remaining_amount: amount,
                reset_time,
                model_ids: vec![model_id],
            }),
        }
    }
    Ok(groups)
}
