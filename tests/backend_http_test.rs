//! `HttpBackend` against a wiremock server.
//!
//! Covers:
//! - Request shape: path, headers, and body for each procedure
//! - Response shapes the backend is known to return
//! - Status mapping (409, 401, other 4xx, 5xx)
//! - Malformed bodies and unreachable hosts

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use healthlink::backend::{BackendSettings, HealthBackend, HttpBackend, LinkRequest};
use healthlink::core::AuthType;
use healthlink::error::HealthLinkError;
use healthlink::test_utils::make_test_session;

use common::logger::TestLogger;

fn backend_for(server: &MockServer) -> HttpBackend {
    let settings = BackendSettings::new(server.uri(), "test-anon-key", Duration::from_secs(5));
    HttpBackend::new(settings).expect("client build")
}

fn oura_request() -> LinkRequest {
    LinkRequest::new("user-123", "oura", "me@example.com")
}

// =============================================================================
// Request shape
// =============================================================================

#[tokio::test]
async fn every_call_carries_auth_headers() {
    let log = TestLogger::new("every_call_carries_auth_headers");
    log.phase("setup");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_vital_user"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(header("apikey", "test-anon-key"))
        .and(header_exists("x-client-info"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vital_user_id": "vital-9"})))
        .expect(1)
        .mount(&server)
        .await;

    log.phase("execute");
    log.http_request("POST", "/rest/v1/rpc/get_vital_user");
    let found = backend_for(&server)
        .lookup_health_account(&make_test_session())
        .await
        .expect("lookup");

    log.phase("verify");
    assert_eq!(found.as_deref(), Some("vital-9"));
    log.finish_ok();
}

#[tokio::test]
async fn lookup_sends_prefixed_user_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_vital_user"))
        .and(body_json(json!({"p_user_id": "user-123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let found = backend_for(&server)
        .lookup_health_account(&make_test_session())
        .await
        .expect("lookup");
    assert_eq!(found, None);
}

#[tokio::test]
async fn lookup_treats_empty_body_as_no_account() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_vital_user"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let found = backend_for(&server)
        .lookup_health_account(&make_test_session())
        .await
        .expect("lookup");
    assert_eq!(found, None);
}

#[tokio::test]
async fn create_posts_user_id_to_edge_function() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/create-vital-user"))
        .and(body_json(json!({"user_id": "user-123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vital_user_id": "vital-new"})))
        .expect(1)
        .mount(&server)
        .await;

    let created = backend_for(&server)
        .create_health_account(&make_test_session())
        .await
        .expect("create");
    assert_eq!(created.as_deref(), Some("vital-new"));
}

#[tokio::test]
async fn list_providers_parses_catalog() {
    let log = TestLogger::new("list_providers_parses_catalog");
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/get-all-providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "providers": [
                {
                    "slug": "oura",
                    "name": "Oura",
                    "description": "Sleep and readiness",
                    "logo": "https://cdn.example.com/oura.png",
                    "authType": "oauth",
                    "supportedResources": ["sleep", "activity"]
                },
                {"slug": "polar", "name": "Polar", "authType": "email_password"},
                {"slug": "future", "name": "Future", "authType": "quantum"}
            ]
        })))
        .mount(&server)
        .await;

    let providers = backend_for(&server)
        .list_providers(&make_test_session())
        .await
        .expect("providers");

    log.phase("verify");
    assert_eq!(providers.len(), 3);
    assert_eq!(providers[0].slug, "oura");
    assert_eq!(providers[0].logo_url.as_deref(), Some("https://cdn.example.com/oura.png"));
    assert!(providers[0].supported_resources.contains("sleep"));
    assert_eq!(providers[1].auth_type, AuthType::EmailPassword);
    assert_eq!(providers[2].auth_type, AuthType::Other);
    log.finish_ok();
}

#[tokio::test]
async fn list_connected_uses_remote_account_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/get-connected-providers"))
        .and(body_json(json!({"user_id": "vital-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "connectedProviders": [{"slug": "oura", "name": "Oura"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connected = backend_for(&server)
        .list_connected_providers(&make_test_session(), "vital-1")
        .await
        .expect("connected");
    assert_eq!(connected.len(), 1);
    assert_eq!(connected[0].slug, "oura");
}

#[tokio::test]
async fn link_token_reports_grant_and_refusal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_vital_link_token"))
        .and(body_json(json!({
            "p_user_id": "user-123",
            "p_provider": "oura",
            "p_device_email": "me@example.com"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_vital_link_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let session = make_test_session();
    assert!(backend.request_link_token(&session, &oura_request()).await.expect("first"));
    assert!(!backend.request_link_token(&session, &oura_request()).await.expect("second"));
}

#[tokio::test]
async fn connect_device_returns_link_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/connect-vital-device"))
        .and(body_json(json!({
            "user_id": "user-123",
            "provider": "oura",
            "device_email": "me@example.com"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "link": {"linkWebUrl": "https://link.tryvital.io/abc"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = backend_for(&server)
        .connect_device(&make_test_session(), &oura_request())
        .await
        .expect("connect");
    assert_eq!(url, "https://link.tryvital.io/abc");
}

#[tokio::test]
async fn connect_device_without_url_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/connect-vital-device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"link": {}})))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .connect_device(&make_test_session(), &oura_request())
        .await
        .unwrap_err();
    assert!(matches!(err, HealthLinkError::ParseResponse(_)), "{err:?}");
}

// =============================================================================
// Status mapping
// =============================================================================

#[tokio::test]
async fn conflict_maps_to_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/create-vital-user"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"error": "User already exists"})))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .create_health_account(&make_test_session())
        .await
        .unwrap_err();
    match err {
        HealthLinkError::AlreadyExists { message } => assert_eq!(message, "User already exists"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/get-all-providers"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "Invalid JWT"})))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .list_providers(&make_test_session())
        .await
        .unwrap_err();
    assert!(matches!(err, HealthLinkError::Unauthorized { status: 401, .. }), "{err:?}");
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("Invalid JWT"));
}

#[tokio::test]
async fn client_error_keeps_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/connect-vital-device"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Provider not supported in region"})),
        )
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .connect_device(&make_test_session(), &oura_request())
        .await
        .unwrap_err();
    assert!(matches!(err, HealthLinkError::ClientError { status: 400, .. }), "{err:?}");
    assert_eq!(err.user_message(), "Provider not supported in region");
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_vital_user"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .lookup_health_account(&make_test_session())
        .await
        .unwrap_err();
    assert!(matches!(err, HealthLinkError::ServerError { status: 502, .. }), "{err:?}");
    assert!(err.is_retryable());
    assert!(!err.is_unsent());
}

#[tokio::test]
async fn malformed_success_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/get-all-providers"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .list_providers(&make_test_session())
        .await
        .unwrap_err();
    assert!(matches!(err, HealthLinkError::ParseResponse(_)), "{err:?}");
    assert!(!err.is_retryable());
}

// =============================================================================
// Transport failures
// =============================================================================

#[tokio::test]
async fn refused_connection_is_unsent() {
    // Non-pooled server so dropping it actually closes the listener.
    let server = MockServer::builder().start().await;
    let uri = server.uri();
    drop(server);

    let settings = BackendSettings::new(uri, "test-anon-key", Duration::from_secs(2));
    let err = HttpBackend::new(settings)
        .expect("client build")
        .lookup_health_account(&make_test_session())
        .await
        .unwrap_err();

    assert!(matches!(err, HealthLinkError::ConnectionFailed { .. }), "{err:?}");
    assert!(err.is_unsent());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/functions/v1/get-all-providers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"providers": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let settings = BackendSettings::new(server.uri(), "test-anon-key", Duration::from_secs(1));
    let err = HttpBackend::new(settings)
        .expect("client build")
        .list_providers(&make_test_session())
        .await
        .unwrap_err();
    assert!(matches!(err, HealthLinkError::Timeout(1)), "{err:?}");
}
