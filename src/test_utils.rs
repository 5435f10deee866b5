//! Test utilities for quota-agg.
//!
//! Provides scripted collaborators, credential and payload factories, and
//! assertion macros for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use quota_agg::test_utils::*;
//!
//! let transport = ScriptedTransport::new()
//!     .respond_for_index("idx-a", 200, make_codex_usage_body(20.0, 40.0));
//! let record = make_codex_record("a.json", "idx-a", "acct-a");
//! ```

use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};

use crate::core::credentials::CredentialRecord;
use crate::core::http::{
    ApiCallRequest, ApiCallResponse, ApiCallTransport, CredentialSource, KiroQuotaSource,
};
use crate::error::{QuotaError, Result};

// =============================================================================
// Scripted Transport
// =============================================================================

#[derive(Debug, Clone)]
enum Reply {
    Response(ApiCallResponse),
    NetworkError(String),
}

#[derive(Debug, Clone)]
struct Route {
    auth_index: Option<String>,
    url: Option<String>,
    reply: Reply,
    delay: Duration,
}

impl Route {
    fn matches(&self, request: &ApiCallRequest) -> bool {
        self.auth_index
            .as_deref()
            .is_none_or(|idx| idx == request.auth_index)
            && self.url.as_deref().is_none_or(|url| url == request.url)
    }
}

/// In-memory [`ApiCallTransport`] answering from a script.
///
/// Routes are matched in the order they were added; the first route whose
/// auth index and URL (when given) both match wins. Unmatched calls fail
/// with a network error. Every call is recorded.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Vec<Route>,
    calls: Mutex<Vec<ApiCallRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn route(
        mut self,
        auth_index: Option<&str>,
        url: Option<&str>,
        reply: Reply,
        delay: Duration,
    ) -> Self {
        self.routes.push(Route {
            auth_index: auth_index.map(str::to_string),
            url: url.map(str::to_string),
            reply,
            delay,
        });
        self
    }

    /// Answer calls for `auth_index` to `url` with a status and JSON body.
    #[must_use]
    pub fn respond(self, auth_index: &str, url: &str, status: u16, body: &Value) -> Self {
        self.route(
            Some(auth_index),
            Some(url),
            Reply::Response(ApiCallResponse::new(status, body.to_string())),
            Duration::ZERO,
        )
    }

    /// Answer any call for `auth_index` with a status and JSON body.
    #[must_use]
    pub fn respond_for_index(self, auth_index: &str, status: u16, body: &Value) -> Self {
        self.route(
            Some(auth_index),
            None,
            Reply::Response(ApiCallResponse::new(status, body.to_string())),
            Duration::ZERO,
        )
    }

    /// Answer any call to `url` with a status and raw body text.
    #[must_use]
    pub fn respond_raw_for_url(self, url: &str, status: u16, body: &str) -> Self {
        self.route(
            None,
            Some(url),
            Reply::Response(ApiCallResponse::new(status, body)),
            Duration::ZERO,
        )
    }

    /// Like [`respond_for_index`](Self::respond_for_index), after a delay.
    #[must_use]
    pub fn respond_after(
        self,
        auth_index: &str,
        delay: Duration,
        status: u16,
        body: &Value,
    ) -> Self {
        self.route(
            Some(auth_index),
            None,
            Reply::Response(ApiCallResponse::new(status, body.to_string())),
            delay,
        )
    }

    /// Fail every call for `auth_index` at the transport level.
    #[must_use]
    pub fn fail_for_index(self, auth_index: &str, message: &str) -> Self {
        self.route(
            Some(auth_index),
            None,
            Reply::NetworkError(message.to_string()),
            Duration::ZERO,
        )
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCallRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ApiCallTransport for ScriptedTransport {
    async fn call(&self, request: ApiCallRequest) -> Result<ApiCallResponse> {
        let route = self.routes.iter().find(|r| r.matches(&request)).cloned();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let Some(route) = route else {
            return Err(QuotaError::Network(format!(
                "no scripted response for {} {}",
                request.auth_index, request.url
            )));
        };
        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
        match route.reply {
            Reply::Response(response) => Ok(response),
            Reply::NetworkError(message) => Err(QuotaError::Network(message)),
        }
    }
}

// =============================================================================
// Static Sources
// =============================================================================

/// [`KiroQuotaSource`] returning fixed snapshots and counting calls.
#[derive(Debug, Default)]
pub struct StaticKiroSource {
    snapshots: Vec<Value>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StaticKiroSource {
    #[must_use]
    pub const fn new(snapshots: Vec<Value>) -> Self {
        Self {
            snapshots,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source whose aggregate call always fails with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            snapshots: Vec::new(),
            failure: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KiroQuotaSource for StaticKiroSource {
    async fn fetch_snapshots(&self) -> Result<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(QuotaError::Network(message.clone())),
            None => Ok(self.snapshots.clone()),
        }
    }
}

/// [`CredentialSource`] returning a fixed record list.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentialSource(pub Vec<CredentialRecord>);

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn list_credentials(&self) -> Result<Vec<CredentialRecord>> {
        Ok(self.0.clone())
    }
}

// =============================================================================
// Credential Factories
// =============================================================================

/// Build a record from a JSON object literal.
///
/// # Panics
///
/// Panics if `value` is not a JSON object.
#[must_use]
pub fn make_record(value: Value) -> CredentialRecord {
    CredentialRecord::from_value(value).expect("credential fixture must be a JSON object")
}

/// Unsigned JWT carrying `claims` as its payload.
#[must_use]
pub fn make_test_jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

#[must_use]
pub fn make_codex_record(name: &str, auth_index: &str, account_id: &str) -> CredentialRecord {
    make_record(json!({
        "name": name,
        "type": "codex",
        "auth_index": auth_index,
        "chatgpt_account_id": account_id,
    }))
}

/// Codex record whose account id and plan live only in the `id_token`.
#[must_use]
pub fn make_codex_record_with_token(
    name: &str,
    auth_index: &str,
    account_id: &str,
    plan: &str,
) -> CredentialRecord {
    let token = make_test_jwt(&json!({
        "email": format!("{name}@example.com"),
        "https://api.openai.com/auth": {
            "chatgpt_account_id": account_id,
            "chatgpt_plan_type": plan,
        }
    }));
    make_record(json!({
        "name": name,
        "type": "codex",
        "auth_index": auth_index,
        "metadata": { "id_token": token },
    }))
}

#[must_use]
pub fn make_claude_record(name: &str, auth_index: &str) -> CredentialRecord {
    make_record(json!({ "name": name, "type": "claude", "auth_index": auth_index }))
}

#[must_use]
pub fn make_gemini_record(name: &str, auth_index: &str, project: &str) -> CredentialRecord {
    make_record(json!({
        "name": name,
        "type": "gemini-cli",
        "auth_index": auth_index,
        "account": format!("{name}@example.com ({project})"),
    }))
}

#[must_use]
pub fn make_antigravity_record(
    name: &str,
    auth_index: &str,
    project: Option<&str>,
) -> CredentialRecord {
    let mut value = json!({ "name": name, "type": "antigravity", "auth_index": auth_index });
    if let Some(project) = project {
        value["project_id"] = json!(project);
    }
    make_record(value)
}

#[must_use]
pub fn make_kiro_record(name: &str) -> CredentialRecord {
    make_record(json!({ "name": name, "type": "kiro" }))
}

// =============================================================================
// Payload Factories
// =============================================================================

/// Codex usage body with both rate-limit windows.
#[must_use]
pub fn make_codex_usage_body(primary_used: f64, secondary_used: f64) -> Value {
    json!({
        "plan_type": "plus",
        "rate_limit": {
            "allowed": true,
            "limit_reached": false,
            "primary_window": { "used_percent": primary_used, "reset_after_seconds": 3600 },
            "secondary_window": { "used_percent": secondary_used, "reset_after_seconds": 86400 }
        }
    })
}

/// Claude usage body with the five-hour and seven-day windows.
#[must_use]
pub fn make_claude_usage_body(five_hour: f64, seven_day: f64) -> Value {
    json!({
        "five_hour": { "utilization": five_hour, "resets_at": null },
        "seven_day": { "utilization": seven_day, "resets_at": null }
    })
}

/// Gemini CLI quota body with one flash and two pro buckets.
#[must_use]
pub fn make_gemini_quota_body() -> Value {
    json!({
        "buckets": [
            { "modelId": "gemini-2.5-flash", "remainingFraction": 0.8, "resetTime": "2026-01-01T00:00:00Z" },
            { "modelId": "gemini-2.5-pro", "remainingFraction": 0.6, "remainingAmount": 60 },
            { "modelId": "gemini-2.5-pro-preview", "remainingFraction": 0.3, "remainingAmount": 30 }
        ]
    })
}

/// Antigravity model catalog keyed by model id.
#[must_use]
pub fn make_antigravity_models_body() -> Value {
    json!({
        "models": {
            "claude-sonnet-4-5": { "quotaInfo": { "remainingFraction": 0.4, "resetTime": "2026-01-01T05:00:00Z" } },
            "gpt-oss-120b": { "quotaInfo": { "remainingFraction": 0.9 } },
            "gemini-3-pro-high": { "quotaInfo": { "remainingFraction": 0.7 } }
        }
    })
}

/// One Kiro snapshot as the backend aggregate reports it.
#[must_use]
pub fn make_kiro_snapshot(name: &str, status: &str, current: f64, limit: f64) -> Value {
    json!({
        "name": name,
        "email": format!("{name}@example.com"),
        "current_usage": current,
        "usage_limit": limit,
        "subscription_title": "KIRO PRO",
        "status": status,
    })
}

/// Config file content pointing at `base_url`.
#[must_use]
pub fn make_test_config_toml(base_url: &str) -> String {
    format!(
        r#"[management]
base_url = "{base_url}"
key = "file-key"
timeout_seconds = 15

[output]
color = false
pretty = false
"#
    )
}

// =============================================================================
// Temp Directory Utilities
// =============================================================================

/// A temporary directory for tests with automatic cleanup.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file with the given content, creating parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
        path
    }

    /// Read a file from the temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.inner.path().join(name))
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that two floats are equal within an epsilon.
#[macro_export]
macro_rules! assert_float_eq {
    ($left:expr, $right:expr) => {
        let left: f64 = $left;
        let right: f64 = $right;
        let epsilon: f64 = f64::EPSILON * 100.0;
        assert!(
            (left - right).abs() < epsilon,
            "Float equality assertion failed: {} != {} (epsilon: {})",
            left,
            right,
            epsilon
        );
    };
}

/// Check if a string contains ANSI escape sequences.
#[must_use]
pub fn has_ansi_codes(text: &str) -> bool {
    text.contains('\x1b')
}
