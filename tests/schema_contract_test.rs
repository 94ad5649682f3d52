//! JSON schema contract tests.
//!
//! Documents produced by the real command paths are validated against
//! `schemas/healthlink-v1.schema.json`, so a field rename or a new
//! required field shows up here before it reaches a consumer.

use std::sync::Arc;

use jsonschema::Validator;
use serde_json::{Value, json};

use healthlink::cli::args::ConnectArgs;
use healthlink::cli::{OutputFormat, connect, login, providers, setup, status};
use healthlink::core::{NoopOpener, RetryPolicies, UserSession};
use healthlink::error::HealthLinkError;
use healthlink::render::{self, OutputOptions};
use healthlink::storage::session::MemoryStore;
use healthlink::test_utils::{
    FakeBackend, make_test_provider, make_test_providers, make_test_session,
};

fn load_schema() -> Validator {
    let raw = include_str!("../schemas/healthlink-v1.schema.json");
    let schema: Value = serde_json::from_str(raw).expect("schema is JSON");
    jsonschema::validator_for(&schema).expect("schema compiles")
}

fn json_options() -> OutputOptions {
    OutputOptions {
        format: OutputFormat::Json,
        flags: vec!["pretty".to_string()],
        ..OutputOptions::default()
    }
}

fn featured() -> Vec<String> {
    vec!["Oura".to_string(), "Garmin".to_string()]
}

fn assert_valid(schema: &Validator, rendered: &str) -> Value {
    let value: Value = serde_json::from_str(rendered).expect("rendered JSON");
    let errors: Vec<String> = schema.iter_errors(&value).map(|e| e.to_string()).collect();
    assert!(errors.is_empty(), "schema violations: {errors:#?}\n{value:#}");
    value
}

fn linked_backend() -> Arc<FakeBackend> {
    Arc::new(
        FakeBackend::new()
            .with_account("vital-1")
            .with_providers(make_test_providers())
            .with_connected(vec![make_test_provider("oura", "Oura")]),
    )
}

// =============================================================================
// Command documents
// =============================================================================

#[tokio::test]
async fn setup_document_matches_schema() {
    let schema = load_schema();
    let payload = setup::run(
        Arc::new(FakeBackend::new()),
        RetryPolicies::immediate(0),
        &make_test_session(),
    )
    .await
    .unwrap();

    let doc = assert_valid(&schema, &render::render_setup(&payload, &json_options()).unwrap());
    assert_eq!(doc["command"], "setup");
    assert_eq!(doc["meta"]["flags"], json!(["pretty"]));
}

#[tokio::test]
async fn status_documents_match_schema() {
    let schema = load_schema();
    let session = make_test_session();

    let registered = status::run(linked_backend(), RetryPolicies::immediate(0), featured(), &session)
        .await
        .unwrap();
    let doc = assert_valid(&schema, &render::render_status(&registered, &json_options()).unwrap());
    assert_eq!(doc["data"]["connected"][0]["slug"], "oura");

    let unregistered = status::run(
        Arc::new(FakeBackend::new().with_providers(make_test_providers())),
        RetryPolicies::immediate(0),
        featured(),
        &session,
    )
    .await
    .unwrap();
    let doc = assert_valid(&schema, &render::render_status(&unregistered, &json_options()).unwrap());
    assert_eq!(doc["data"]["registered"], false);
}

#[tokio::test]
async fn providers_document_never_lists_sdk_providers() {
    let schema = load_schema();
    let payload = providers::run(
        linked_backend(),
        RetryPolicies::immediate(0),
        featured(),
        &make_test_session(),
        None,
    )
    .await
    .unwrap();

    let doc = assert_valid(&schema, &render::render_providers(&payload, &json_options()).unwrap());
    let auth_types: Vec<&str> = doc["data"]["providers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["authType"].as_str().unwrap())
        .collect();
    assert!(!auth_types.contains(&"sdk"));
    assert!(doc["data"].get("search").is_none());
}

#[tokio::test]
async fn searched_providers_document_matches_schema() {
    let schema = load_schema();
    let payload = providers::run(
        linked_backend(),
        RetryPolicies::immediate(0),
        featured(),
        &make_test_session(),
        Some("gar"),
    )
    .await
    .unwrap();

    let doc = assert_valid(&schema, &render::render_providers(&payload, &json_options()).unwrap());
    assert_eq!(doc["data"]["search"], "gar");
    assert_eq!(doc["data"]["providers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn connect_document_matches_schema() {
    let schema = load_schema();
    let args = ConnectArgs {
        provider: "garmin".to_string(),
        email: "me@example.com".to_string(),
        no_open: true,
    };
    let payload = connect::run(
        linked_backend(),
        RetryPolicies::immediate(0),
        featured(),
        Arc::new(NoopOpener::new()),
        make_test_session(),
        &args,
    )
    .await
    .unwrap();

    let doc = assert_valid(&schema, &render::render_connect(&payload, &json_options()).unwrap());
    assert_eq!(doc["data"]["providerName"], "Garmin");
}

#[test]
fn session_documents_match_schema() {
    let schema = load_schema();
    let store = MemoryStore::new();

    let stored = login::run_login(&store, &UserSession::new("user-9", "token")).unwrap();
    assert_valid(&schema, &render::render_login(&stored, &json_options()).unwrap());

    let removed = login::run_logout(&store).unwrap();
    let doc = assert_valid(&schema, &render::render_logout(&removed, &json_options()).unwrap());
    assert_eq!(doc["data"]["changed"], true);

    let nothing = login::run_logout(&store).unwrap();
    let doc = assert_valid(&schema, &render::render_logout(&nothing, &json_options()).unwrap());
    assert!(doc["data"].get("userId").is_none());
}

// =============================================================================
// Negative cases
// =============================================================================

#[test]
fn wrong_schema_version_fails() {
    let schema = load_schema();
    let doc = json!({
        "schemaVersion": "healthlink.v2",
        "generatedAt": "2026-10-16T10:30:00Z",
        "command": "logout",
        "data": {"stored": false, "changed": false},
        "errors": [],
        "meta": {"format": "json", "flags": [], "runtime": "cli"}
    });
    assert!(!schema.is_valid(&doc));
}

#[test]
fn unknown_command_fails() {
    let schema = load_schema();
    let doc = json!({
        "schemaVersion": "healthlink.v1",
        "generatedAt": "2026-10-16T10:30:00Z",
        "command": "sync",
        "data": {},
        "errors": [],
        "meta": {"format": "json", "flags": [], "runtime": "cli"}
    });
    assert!(!schema.is_valid(&doc));
}

#[test]
fn sdk_provider_entry_fails() {
    let schema = load_schema();
    let doc = json!({
        "schemaVersion": "healthlink.v1",
        "generatedAt": "2026-10-16T10:30:00Z",
        "command": "providers",
        "data": {
            "registered": true,
            "total": 1,
            "providers": [{
                "slug": "apple_health_kit",
                "name": "Apple HealthKit",
                "description": "No description available",
                "authType": "sdk",
                "featured": false,
                "connected": false
            }]
        },
        "errors": [],
        "meta": {"format": "json", "flags": [], "runtime": "cli"}
    });
    assert!(!schema.is_valid(&doc));
}

#[test]
fn non_http_authorization_url_fails() {
    let schema = load_schema();
    let doc = json!({
        "schemaVersion": "healthlink.v1",
        "generatedAt": "2026-10-16T10:30:00Z",
        "command": "connect",
        "data": {
            "provider": "oura",
            "providerName": "Oura",
            "authorizationUrl": "javascript:alert(1)",
            "opened": false
        },
        "errors": [],
        "meta": {"format": "json", "flags": [], "runtime": "cli"}
    });
    assert!(!schema.is_valid(&doc));
}

// =============================================================================
// Error object
// =============================================================================

#[test]
fn error_json_has_stable_keys() {
    let rendered = render::error::render_error_json(&HealthLinkError::SetupRequired, false);
    let value: Value = serde_json::from_str(&rendered).unwrap();
    let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["category", "error_code", "exit_code", "is_retryable", "message", "suggestions"]
    );
    assert_eq!(value["exit_code"], 2);
    assert!(!value["suggestions"].as_array().unwrap().is_empty());
}
