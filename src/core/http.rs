//! Transport to the proxy management API.
//!
//! Provider quota endpoints are never called directly. Every outbound call is
//! relayed through the proxy's `api-call` endpoint, which injects the stored
//! credential identified by an auth index. [`ApiCallTransport`] is that
//! capability; [`ManagementClient`] implements it (and the two listing
//! collaborators) over reqwest.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde_json::{Value, json};

use super::credentials::CredentialRecord;
use crate::error::{QuotaError, Result};
use crate::util::normalize::{lookup, normalize_number, normalize_string};

/// Default timeout for management API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authorization header value the proxy replaces with the stored access token.
pub const BEARER_TOKEN_PLACEHOLDER: &str = "Bearer $TOKEN$";

const API_CALL_PATH: &str = "/v0/management/api-call";
const AUTH_FILES_PATH: &str = "/v0/management/auth-files";
const KIRO_QUOTA_PATH: &str = "/v0/management/kiro-quota";

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(user_agent())
        .build()
        .map_err(|e| QuotaError::Network(e.to_string()))
}

/// User agent sent to the management API and forwarded upstream.
#[must_use]
pub fn user_agent() -> String {
    format!("quota-agg/{}", env!("CARGO_PKG_VERSION"))
}

// =============================================================================
// Api-call request/response
// =============================================================================

/// Method of a relayed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One outbound call, made on behalf of the credential behind `auth_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCallRequest {
    pub auth_index: String,
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl ApiCallRequest {
    #[must_use]
    pub fn get(auth_index: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            auth_index: auth_index.into(),
            method: HttpMethod::Get,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn post(auth_index: impl Into<String>, url: impl Into<String>, body: &Value) -> Self {
        Self {
            auth_index: auth_index.into(),
            method: HttpMethod::Post,
            url: url.into(),
            headers: BTreeMap::new(),
            body: Some(body.to_string()),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add the headers every relayed JSON call carries.
    #[must_use]
    pub fn with_default_headers(self) -> Self {
        self.header("Authorization", BEARER_TOKEN_PLACEHOLDER)
            .header("Content-Type", "application/json")
            .header("User-Agent", user_agent())
    }

    /// Parsed JSON body, if any.
    #[must_use]
    pub fn json_body(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

/// Upstream status code and body text, as relayed by the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCallResponse {
    pub status_code: u16,
    pub body: String,
}

impl ApiCallResponse {
    #[must_use]
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }

    /// Fail with the upstream message unless the status is 2xx.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::UpstreamRejected`] for non-2xx statuses.
    pub fn ensure_success(&self, provider: &str) -> Result<()> {
        if self.is_success() {
            return Ok(());
        }
        Err(QuotaError::UpstreamRejected {
            provider: provider.to_string(),
            status: self.status_code,
            message: upstream_error_message(&self.body, self.status_code),
        })
    }

    /// Body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::EmptyPayload`] when the body is blank or not JSON.
    pub fn json(&self, provider: &str) -> Result<Value> {
        let text = self.body.trim();
        if text.is_empty() {
            return Err(QuotaError::empty(provider, "empty body"));
        }
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Null) => Err(QuotaError::empty(provider, "null body")),
            Ok(value) => Ok(value),
            Err(e) => Err(QuotaError::empty(provider, format!("invalid JSON: {e}"))),
        }
    }
}

/// Best message from an error body: `error.message`, `error`, `message`,
/// `detail`, else `HTTP <status>`.
#[must_use]
pub fn upstream_error_message(body: &str, status: u16) -> String {
    let parsed = serde_json::from_str::<Value>(body.trim()).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(normalize_string)
                .or_else(|| v.get("error").and_then(normalize_string))
                .or_else(|| v.get("message").and_then(normalize_string))
                .or_else(|| v.get("detail").and_then(normalize_string))
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}

// =============================================================================
// Collaborator traits
// =============================================================================

/// Authenticated outbound call on behalf of a stored credential.
#[async_trait]
pub trait ApiCallTransport: Send + Sync {
    /// Relay `request` and return the upstream status and body.
    ///
    /// A non-2xx upstream status is a successful call; only transport-level
    /// failures are errors.
    async fn call(&self, request: ApiCallRequest) -> Result<ApiCallResponse>;
}

/// Listing of stored credentials.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn list_credentials(&self) -> Result<Vec<CredentialRecord>>;
}

/// Pre-computed Kiro usage snapshots from the backend aggregate.
#[async_trait]
pub trait KiroQuotaSource: Send + Sync {
    /// All snapshots, as loosely shaped JSON objects.
    async fn fetch_snapshots(&self) -> Result<Vec<Value>>;
}

// =============================================================================
// Management client
// =============================================================================

/// reqwest client for the proxy management API.
#[derive(Debug, Clone)]
pub struct ManagementClient {
    client: Client,
    base_url: String,
    management_key: Option<String>,
    timeout: Duration,
}

impl ManagementClient {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:8317`).
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is blank or the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        management_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(QuotaError::Config("management base URL is empty".to_string()));
        }
        Ok(Self {
            client: build_client(timeout)?,
            base_url,
            management_key: management_key.filter(|k| !k.trim().is_empty()),
            timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.management_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        self.authorize(builder).send().await.map_err(|e| {
            if e.is_timeout() {
                QuotaError::Timeout(self.timeout.as_secs())
            } else {
                QuotaError::Network(e.to_string())
            }
        })
    }

    async fn read_json(&self, response: Response) -> Result<Value> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| QuotaError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(QuotaError::Management {
                status: status.as_u16(),
                message: upstream_error_message(&text, status.as_u16()),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "GET management endpoint");
        let response = self.send(self.client.get(&url)).await?;
        self.read_json(response).await
    }
}

#[async_trait]
impl ApiCallTransport for ManagementClient {
    async fn call(&self, request: ApiCallRequest) -> Result<ApiCallResponse> {
        let url = self.endpoint(API_CALL_PATH);
        let payload = json!({
            "auth_index": request.auth_index,
            "method": request.method.as_str(),
            "url": request.url,
            "header": request.headers,
            "data": request.body.clone().unwrap_or_default(),
        });

        tracing::debug!(
            auth_index = %request.auth_index,
            method = request.method.as_str(),
            target = %request.url,
            "Relaying api-call"
        );

        let response = self.send(self.client.post(&url).json(&payload)).await?;
        let envelope = self.read_json(response).await?;
        let relayed = parse_api_call_envelope(&envelope)?;

        tracing::debug!(
            auth_index = %request.auth_index,
            status = relayed.status_code,
            bytes = relayed.body.len(),
            "api-call returned"
        );
        Ok(relayed)
    }
}

#[async_trait]
impl CredentialSource for ManagementClient {
    async fn list_credentials(&self) -> Result<Vec<CredentialRecord>> {
        let value = self.get_json(AUTH_FILES_PATH).await?;
        let files = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("files") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(files
            .into_iter()
            .filter_map(CredentialRecord::from_value)
            .collect())
    }
}

#[async_trait]
impl KiroQuotaSource for ManagementClient {
    async fn fetch_snapshots(&self) -> Result<Vec<Value>> {
        let value = self.get_json(KIRO_QUOTA_PATH).await?;
        let snapshots = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("quotas") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(snapshots.into_iter().filter(Value::is_object).collect())
    }
}

/// Decode the `{status_code, body}` envelope of an api-call response.
///
/// `body` may be a JSON string or an inline JSON value; both become text.
///
/// # Errors
///
/// Returns [`QuotaError::Network`] when no status code is present.
pub fn parse_api_call_envelope(envelope: &Value) -> Result<ApiCallResponse> {
    let status = lookup(envelope, "status_code")
        .and_then(normalize_number)
        .filter(|s| (100.0..=599.0).contains(s))
        .ok_or_else(|| QuotaError::Network("api-call response has no status code".to_string()))?;

    let body = match lookup(envelope, "body") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let status_code = status as u16;
    Ok(ApiCallResponse::new(status_code, body))
}
