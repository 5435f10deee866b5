//! wiremock fixtures for the proxy management API.
#![allow(dead_code)]

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_CALL: &str = "/v0/management/api-call";
pub const AUTH_FILES: &str = "/v0/management/auth-files";
pub const KIRO_QUOTA: &str = "/v0/management/kiro-quota";

/// Serve `files` from the auth-files listing.
pub async fn mount_auth_files(server: &MockServer, files: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(AUTH_FILES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": files })))
        .mount(server)
        .await;
}

/// Relay an upstream `status` and JSON `body` for calls made with `auth_index`.
///
/// The upstream body is sent as a JSON string, the way the proxy relays it.
pub async fn mount_api_call(server: &MockServer, auth_index: &str, status: u16, body: &Value) {
    Mock::given(method("POST"))
        .and(path(API_CALL))
        .and(body_partial_json(json!({ "auth_index": auth_index })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": status,
            "body": body.to_string(),
        })))
        .mount(server)
        .await;
}

/// Like [`mount_api_call`], narrowed to one upstream URL.
pub async fn mount_api_call_for_url(
    server: &MockServer,
    auth_index: &str,
    url: &str,
    status: u16,
    body: &Value,
) {
    Mock::given(method("POST"))
        .and(path(API_CALL))
        .and(body_partial_json(json!({ "auth_index": auth_index, "url": url })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": status,
            "body": body.to_string(),
        })))
        .mount(server)
        .await;
}

/// Serve Kiro snapshots, expecting exactly `expected_calls` requests.
pub async fn mount_kiro_quota(server: &MockServer, snapshots: Vec<Value>, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(KIRO_QUOTA))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "quotas": snapshots })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Auth-file entry for a Codex account.
#[must_use]
pub fn codex_file(name: &str, auth_index: &str, account_id: &str) -> Value {
    json!({
        "name": name,
        "type": "codex",
        "auth_index": auth_index,
        "email": format!("{name}@example.com"),
        "chatgpt_account_id": account_id,
    })
}

/// Auth-file entry for a Kiro account.
#[must_use]
pub fn kiro_file(name: &str) -> Value {
    json!({ "name": name, "type": "kiro", "auth_index": format!("kiro-{name}") })
}
