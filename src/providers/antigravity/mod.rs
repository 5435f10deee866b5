//! Antigravity grouped-model quota.
//!
//! `fetchAvailableModels` is served from several hosts and has accepted the
//! project id under two different keys. Every {host x body} pair is probed in
//! order until one returns a catalog that matches at least one known model
//! group.

use serde_json::{Value, json};

use crate::core::credentials::{CredentialRecord, resolve_auth_index, resolve_project_id};
use crate::core::http::{ApiCallRequest, ApiCallResponse, ApiCallTransport};
use crate::core::models::{ModelGroup, ProviderQuota};
use crate::core::probe::{self, ProbePlan};
use crate::error::{QuotaError, Result};
use crate::util::normalize::{normalize_number, normalize_string};

pub const PROVIDER: &str = "antigravity";

/// Candidate endpoints, in probing order.
pub const MODEL_URLS: [&str; 3] = [
    "https://daily-cloudcode-pa.googleapis.com/v1internal:fetchAvailableModels",
    "https://daily-cloudcode-pa.sandbox.googleapis.com/v1internal:fetchAvailableModels",
    "https://cloudcode-pa.googleapis.com/v1internal:fetchAvailableModels",
];

/// Client identity the model endpoints expect.
pub const USER_AGENT: &str = "antigravity/1.104.0 darwin/arm64";

/// A named model group matched by case-insensitive substring.
#[derive(Debug, Clone, Copy)]
pub struct GroupDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub identifiers: &'static [&'static str],
}

/// Known model groups, in display order.
pub const GROUPS: &[GroupDefinition] = &[
    GroupDefinition {
        id: "claude-gpt",
        label: "Claude/GPT",
        identifiers: &["claude", "gpt"],
    },
    GroupDefinition {
        id: "gemini-3-pro",
        label: "Gemini 3 Pro",
        identifiers: &["gemini-3-pro-high", "gemini-3-pro-low"],
    },
    GroupDefinition {
        id: "gemini-3-pro-image",
        label: "Gemini 3 Pro Image",
        identifiers: &["gemini-3-pro-image"],
    },
    GroupDefinition {
        id: "gemini-3-flash",
        label: "Gemini 3 Flash",
        identifiers: &["gemini-3-flash"],
    },
    GroupDefinition {
        id: "gemini-2-5-pro",
        label: "Gemini 2.5 Pro",
        identifiers: &["gemini-2.5-pro"],
    },
    GroupDefinition {
        id: "gemini-2-5-flash",
        label: "Gemini 2.5 Flash",
        identifiers: &["gemini-2.5-flash"],
    },
    GroupDefinition {
        id: "gemini-2-5-flash-lite",
        label: "Gemini 2.5 Flash Lite",
        identifiers: &["gemini-2.5-flash-lite"],
    },
    GroupDefinition {
        id: "gemini-2-5-cu",
        label: "Gemini 2.5 Computer Use",
        identifiers: &["rev19-uic3"],
    },
];

/// One entry of the upstream model catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogModel {
    pub id: String,
    pub remaining_fraction: f64,
    pub reset_time: Option<String>,
}

// =============================================================================
// Probing
// =============================================================================

/// Candidate request bodies for a credential.
#[must_use]
pub fn candidate_bodies(project_id: Option<&str>) -> Vec<Value> {
    match project_id {
        Some(id) => vec![json!({ "project": id }), json!({ "projectId": id })],
        None => vec![json!({})],
    }
}

/// Probe plan for a credential.
#[must_use]
pub fn probe_plan(record: &CredentialRecord) -> ProbePlan {
    let project_id = resolve_project_id(record);
    ProbePlan::new(
        PROVIDER,
        &MODEL_URLS,
        &candidate_bodies(project_id.as_deref()),
    )
}

/// Probe the endpoints for one Antigravity credential.
///
/// # Errors
///
/// Returns [`QuotaError::MissingInput`] without an auth index, or
/// [`QuotaError::ProbeExhausted`] with the last failure message when no
/// candidate produced a usable catalog.
pub async fn fetch_quota(
    transport: &dyn ApiCallTransport,
    record: &CredentialRecord,
) -> Result<ProviderQuota> {
    let auth_index =
        resolve_auth_index(record).ok_or_else(|| QuotaError::missing(PROVIDER, "auth_index"))?;
    let plan = probe_plan(record);

    let outcome = probe::run(&plan, |candidate| {
        let request = ApiCallRequest::post(auth_index.clone(), candidate.url, &candidate.body)
            .with_default_headers()
            .header("User-Agent", USER_AGENT);
        async move {
            let response = transport.call(request).await?;
            parse_response(&response)
        }
    })
    .await;

    tracing::debug!(
        attempts = outcome.attempts.len(),
        success = outcome.is_success(),
        "Antigravity probing finished"
    );
    outcome.result.map(ProviderQuota::Antigravity)
}

/// Decide whether one probe response is usable.
///
/// # Errors
///
/// Fails on non-2xx, a blank body, an empty catalog, or a catalog that
/// matches no known group.
pub fn parse_response(response: &ApiCallResponse) -> Result<Vec<ModelGroup>> {
    response.ensure_success(PROVIDER)?;
    let body = response.json(PROVIDER)?;

    let catalog = parse_catalog(&body);
    if catalog.is_empty() {
        return Err(QuotaError::empty(PROVIDER, "no models in response"));
    }

    let groups = build_groups(&catalog);
    if groups.is_empty() {
        return Err(QuotaError::empty(PROVIDER, "no known model groups"));
    }
    Ok(groups)
}

// =============================================================================
// Catalog parsing
// =============================================================================

/// Flatten the `models` catalog, given as an id-keyed object or an array.
#[must_use]
pub fn parse_catalog(body: &Value) -> Vec<CatalogModel> {
    match body.get("models") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(id, info)| catalog_entry(id.clone(), info))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let id = ["id", "model", "name"]
                    .into_iter()
                    .find_map(|k| item.get(k).and_then(normalize_string))?;
                Some(catalog_entry(id, item))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn catalog_entry(id: String, info: &Value) -> CatalogModel {
    let quota = info.get("quotaInfo").or_else(|| info.get("quota_info"));
    let remaining_fraction = quota
        .and_then(|q| {
            ["remainingFraction", "remaining_fraction", "remaining"]
                .into_iter()
                .find_map(|k| q.get(k).and_then(normalize_number))
        })
        .unwrap_or(1.0);
    let reset_time = quota.and_then(|q| {
        ["resetTime", "reset_time"]
            .into_iter()
            .find_map(|k| q.get(k).and_then(normalize_string))
    });
    CatalogModel {
        id,
        remaining_fraction,
        reset_time,
    }
}

/// Match the catalog against [`GROUPS`].
///
/// A group is emitted only when at least one model matched; its fraction and
/// reset time come from the matched model with the lowest fraction.
#[must_use]
pub fn build_groups(catalog: &[CatalogModel]) -> Vec<ModelGroup> {
    GROUPS
        .iter()
        .filter_map(|def| {
            let matched: Vec<&CatalogModel> = catalog
                .iter()
                .filter(|m| {
                    let lower = m.id.to_lowercase();
                    def.identifiers.iter().any(|ident| lower.contains(ident))
                })
                .collect();

            let worst = matched.iter().copied().reduce(|best, m| {
                if m.remaining_fraction < best.remaining_fraction {
                    m
                } else {
                    best
                }
            })?;

            Some(ModelGroup {
                id: def.id.to_string(),
                label: def.label.to_string(),
                models: matched.iter().map(|m| m.id.clone()).collect(),
                remaining_fraction: worst.remaining_fraction,
                reset_time: worst.reset_time.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_catalog_with_defaults() {
        let body = json!({"models": {
            "claude-sonnet-4-5": {"quotaInfo": {"remainingFraction": 0.4, "resetTime": "r1"}},
            "gpt-oss-120b": {"quotaInfo": {"remainingFraction": 0.7, "resetTime": "r2"}},
            "gemini-3-pro-high": {}
        }});
        let groups = build_groups(&parse_catalog(&body));
        let ids: Vec<_> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["claude-gpt", "gemini-3-pro"]);
        assert!((groups[0].remaining_fraction - 0.4).abs() < f64::EPSILON);
        assert_eq!(groups[0].reset_time.as_deref(), Some("r1"));
        assert_eq!(groups[0].models.len(), 2);
        assert!((groups[1].remaining_fraction - 1.0).abs() < f64::EPSILON);
        assert_eq!(groups[1].reset_time, None);
    }

    #[test]
    fn array_catalog_and_alternate_fraction_keys() {
        let body = json!({"models": [
            {"model": "Gemini-3-Flash", "quota_info": {"remaining": "0.25"}},
            {"name": "rev19-uic3-1p", "quotaInfo": {"remaining_fraction": 0.5}},
            {"other": "ignored"}
        ]});
        let catalog = parse_catalog(&body);
        assert_eq!(catalog.len(), 2);
        let groups = build_groups(&catalog);
        let ids: Vec<_> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["gemini-3-flash", "gemini-2-5-cu"]);
        assert!((groups[0].remaining_fraction - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn unmatched_catalog_is_not_usable() {
        let response = ApiCallResponse::new(200, json!({"models": {"chat_20706": {}}}).to_string());
        assert!(matches!(
            parse_response(&response),
            Err(QuotaError::EmptyPayload { .. })
        ));
    }

    #[test]
    fn empty_catalog_is_not_usable() {
        let response = ApiCallResponse::new(200, r#"{"models": {}}"#);
        assert!(parse_response(&response).is_err());
    }

    #[test]
    fn rejected_status_is_not_usable() {
        let response = ApiCallResponse::new(403, r#"{"error":{"message":"denied"}}"#);
        assert_eq!(parse_response(&response).unwrap_err().to_string(), "denied");
    }

    #[test]
    fn bodies_depend_on_project_id() {
        assert_eq!(
            candidate_bodies(Some("p")),
            vec![json!({"project": "p"}), json!({"projectId": "p"})]
        );
        assert_eq!(candidate_bodies(None), vec![json!({})]);
    }

    #[test]
    fn plan_covers_every_url_and_body() {
        let record = CredentialRecord::from_value(json!({"auth_index": "a", "project_id": "p"})).unwrap();
        let plan = probe_plan(&record);
        assert_eq!(plan.len(), 6);
        assert_eq!(plan.candidates[0].url, MODEL_URLS[0]);
        assert_eq!(plan.candidates[5].url, MODEL_URLS[2]);
    }
}
