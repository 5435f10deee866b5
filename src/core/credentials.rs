//! Credential records and field resolution.
//!
//! Stored credentials arrive from the management API as loosely shaped JSON.
//! The same identifier may live directly on the record (in snake_case or
//! camelCase), inside a nested `metadata` object, or only inside the claims
//! of an `id_token`. The resolvers here try each location in that order.
//!
//! Token decoding is unverified field extraction. Nothing decoded here is
//! used to make a trust decision.

use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::provider::ProviderKind;
use crate::util::normalize::{camel_case, lookup, normalize_string};

/// Claim namespace OpenAI uses for ChatGPT account details.
const OPENAI_AUTH_CLAIM: &str = "https://api.openai.com/auth";

/// Last parenthesized group of an `account` label.
static TRAILING_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()]*)\)[^()]*$").unwrap());

// =============================================================================
// Credential Record
// =============================================================================

/// One stored credential as listed by the management API.
///
/// The engine only ever reads from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRecord(Map<String, Value>);

impl CredentialRecord {
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value; `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Raw field under its snake_case or camelCase spelling, skipping nulls.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        let camel = camel_case(key);
        [key, camel.as_str()]
            .into_iter()
            .filter_map(|k| self.0.get(k))
            .find(|v| !v.is_null())
    }

    /// Nested `metadata` object, if any.
    #[must_use]
    pub fn metadata(&self) -> Option<&Value> {
        self.get("metadata").filter(|v| v.is_object())
    }

    /// Record name (usually the auth file name).
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.get("name").and_then(normalize_string)
    }

    /// Declared credential type (`type`, falling back to `provider`).
    #[must_use]
    pub fn credential_type(&self) -> Option<String> {
        self.get("type")
            .or_else(|| self.get("provider"))
            .and_then(normalize_string)
    }

    /// Provider kind declared by the record, if recognized.
    #[must_use]
    pub fn provider_kind(&self) -> Option<ProviderKind> {
        self.credential_type().as_deref().and_then(ProviderKind::parse)
    }

    /// Whether the record belongs to `kind`.
    #[must_use]
    pub fn belongs_to(&self, kind: ProviderKind) -> bool {
        self.provider_kind() == Some(kind)
    }

    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for CredentialRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

// =============================================================================
// Generic resolution
// =============================================================================

/// Resolve `field` from the record, its metadata, or its `id_token` claims.
///
/// Strings are trimmed and blank strings count as absent. Numeric values are
/// rendered in decimal so an integer auth index still resolves.
#[must_use]
pub fn resolve_field(record: &CredentialRecord, field: &str) -> Option<String> {
    if let Some(found) = record.get(field).and_then(identifier_string) {
        return Some(found);
    }

    let metadata = record.metadata();
    if let Some(found) = metadata
        .and_then(|m| lookup(m, field))
        .and_then(identifier_string)
    {
        return Some(found);
    }

    let token = record
        .get("id_token")
        .and_then(normalize_string)
        .or_else(|| metadata.and_then(|m| lookup(m, "id_token")).and_then(normalize_string))?;
    let claims = decode_id_token(&token)?;
    claim_field(&claims, field)
}

fn identifier_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        other => normalize_string(other),
    }
}

fn claim_field(claims: &Value, field: &str) -> Option<String> {
    lookup(claims, field)
        .and_then(identifier_string)
        .or_else(|| {
            claims
                .get(OPENAI_AUTH_CLAIM)
                .and_then(|ns| lookup(ns, field))
                .and_then(identifier_string)
        })
}

/// Decode the payload segment of a JWT without verifying it.
///
/// Returns `None` unless the token has exactly three segments and the middle
/// one is base64url-encoded JSON object text. Padding is tolerated.
#[must_use]
pub fn decode_id_token(token: &str) -> Option<Value> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(segments = parts.len(), "id_token is not a three-part JWT");
        return None;
    }

    let payload = parts[1].trim_end_matches('=');
    let decoded = match URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
    {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to decode id_token payload");
            return None;
        }
    };

    match serde_json::from_slice::<Value>(&decoded) {
        Ok(claims) if claims.is_object() => Some(claims),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "id_token payload is not JSON");
            None
        }
    }
}

// =============================================================================
// Typed resolvers
// =============================================================================

/// Auth index: the handle the transport needs to act for this credential.
#[must_use]
pub fn resolve_auth_index(record: &CredentialRecord) -> Option<String> {
    resolve_field(record, "auth_index")
}

/// ChatGPT account id (`chatgpt_account_id`, then `account_id`).
#[must_use]
pub fn resolve_account_id(record: &CredentialRecord) -> Option<String> {
    resolve_field(record, "chatgpt_account_id").or_else(|| resolve_field(record, "account_id"))
}

/// Canonical plan type (`plan_type`, then `chatgpt_plan_type`).
#[must_use]
pub fn resolve_plan_type(record: &CredentialRecord) -> Option<String> {
    resolve_field(record, "plan_type")
        .or_else(|| resolve_field(record, "chatgpt_plan_type"))
        .and_then(|raw| canonicalize_plan_type(&raw))
}

/// Cloud project id.
///
/// Falls back to the last parenthesized group of the `account` label, which
/// is where Gemini CLI credentials carry it (`"me@x.com (proj-123)"`).
#[must_use]
pub fn resolve_project_id(record: &CredentialRecord) -> Option<String> {
    resolve_field(record, "project_id").or_else(|| {
        let account = record.get("account").and_then(normalize_string)?;
        TRAILING_PAREN
            .captures(&account)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Human label for the account.
#[must_use]
pub fn resolve_display_name(record: &CredentialRecord) -> String {
    ["label", "name", "email", "account"]
        .into_iter()
        .find_map(|key| record.get(key).and_then(normalize_string))
        .or_else(|| resolve_auth_index(record))
        .unwrap_or_else(|| "unnamed".to_string())
}

/// Key used to track the account's result: auth index, else name.
#[must_use]
pub fn result_key(record: &CredentialRecord) -> String {
    resolve_auth_index(record)
        .or_else(|| record.name())
        .unwrap_or_else(|| resolve_display_name(record))
}

/// Collapse known plan aliases; pass anything else through trimmed.
#[must_use]
pub fn canonicalize_plan_type(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let canonical = match trimmed.to_ascii_lowercase().as_str() {
        "plus" | "chatgpt-plus" => "plus".to_string(),
        "team" | "chatgpt-team" => "team".to_string(),
        "free" | "chatgpt-free" => "free".to_string(),
        _ => trimmed.to_string(),
    };
    Some(canonical)
}
