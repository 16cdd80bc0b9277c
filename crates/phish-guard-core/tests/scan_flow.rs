use std::sync::Arc;

use httpmock::prelude::*;
use phish_guard_core::{
    ApiClient, ApiError, Authenticator, ClientSettings, ErrorCause, RiskTier, ScanError,
    ScanSession, ScanStatus, SessionState,
};
use serde_json::{json, Value};

fn client_for(base_url: String) -> Arc<ApiClient> {
    let settings = ClientSettings {
        base_url,
        ..ClientSettings::default()
    };
    Arc::new(ApiClient::new(&settings, SessionState::new()).expect("client should build"))
}

fn verdict_body(url: &str, status: &str, risk_score: f64) -> Value {
    json!({
        "url": url,
        "status": status,
        "risk_score": risk_score,
        "details": {
            "domain_age": 3,
            "ssl_certificate": false,
            "reputation_score": 0.05,
            "blacklist_status": "listed"
        }
    })
}

#[tokio::test]
async fn login_token_is_sent_with_later_scans() {
    let server = MockServer::start_async().await;
    let login = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/users/login")
                .matches(|req| {
                    req.headers.as_ref().map_or(true, |headers| {
                        headers
                            .iter()
                            .all(|(name, _)| !name.eq_ignore_ascii_case("authorization"))
                    })
                })
                .json_body(json!({ "username": "alice", "email": "a@x.com", "password": "pw" }));
            then.status(200).json_body(json!({
                "statusCode": 200,
                "data": { "user": { "username": "alice" }, "accessToken": "tok123" },
                "message": "User logged in successfully"
            }));
        })
        .await;
    let scan = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/scan")
                .header("authorization", "Bearer tok123")
                .json_body(json!({ "url": "https://good.com" }));
            then.status(200)
                .json_body(verdict_body("https://good.com", "safe", 0.05));
        })
        .await;

    let client = client_for(server.base_url());
    let auth = Authenticator::new(Arc::clone(&client));
    auth.login("alice", "a@x.com", "pw").await.unwrap();
    assert_eq!(client.session().token().as_deref(), Some("tok123"));

    let session = ScanSession::new(Arc::clone(&client));
    let verdict = session.submit_scan("https://good.com").await.unwrap();
    assert_eq!(verdict.status, ScanStatus::Safe);
    assert_eq!(verdict.tier(), RiskTier::Safe);

    login.assert_async().await;
    scan.assert_async().await;
}

#[tokio::test]
async fn suspicious_payload_is_classified_and_recorded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/scan")
                .json_body(json!({ "url": "https://evil.com" }));
            then.status(200)
                .json_body(verdict_body("https://evil.com", "suspicious", 0.95));
        })
        .await;

    let session = ScanSession::new(client_for(server.base_url()));
    let verdict = session.submit_scan("https://evil.com").await.unwrap();

    assert_eq!(verdict.status, ScanStatus::Suspicious);
    assert_eq!(verdict.tier(), RiskTier::Danger);
    let history = session.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].url, "https://evil.com");
    assert!((history[0].risk_score - 0.95).abs() < f64::EPSILON);
}

#[tokio::test]
async fn server_error_is_returned_and_history_is_unchanged() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/scan")
                .json_body(json!({ "url": "https://good.com" }));
            then.status(200)
                .json_body(verdict_body("https://good.com", "safe", 0.2));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/scan")
                .json_body(json!({ "url": "https://busy.com" }));
            then.status(500).json_body(json!({ "message": "server busy" }));
        })
        .await;

    let session = ScanSession::new(client_for(server.base_url()));
    session.submit_scan("https://good.com").await.unwrap();
    let before = session.history();

    let err = session.submit_scan("https://busy.com").await.unwrap_err();
    match err {
        ScanError::Api(ApiError { cause, message, .. }) => {
            assert_eq!(cause, ErrorCause::HttpStatus);
            assert_eq!(message, "server busy");
        }
        other => panic!("expected an API error, got {other:?}"),
    }
    assert_eq!(session.history(), before);
}

#[tokio::test]
async fn unauthorized_response_clears_credential() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/users/current-user");
            then.status(401).json_body(json!({ "message": "Unauthorized request" }));
        })
        .await;

    let client = client_for(server.base_url());
    client.session().set_token("expired");
    let auth = Authenticator::new(Arc::clone(&client));

    let err = auth.current_user().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.message, "Unauthorized request");
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn rejected_scan_clears_credential_but_server_error_keeps_it() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/scan")
                .json_body(json!({ "url": "https://busy.com" }));
            then.status(500).json_body(json!({ "message": "server busy" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/scan")
                .json_body(json!({ "url": "https://good.com" }));
            then.status(401).json_body(json!({ "message": "Unauthorized request" }));
        })
        .await;

    let client = client_for(server.base_url());
    client.session().set_token("expired");
    let auth = Authenticator::new(Arc::clone(&client));
    let session = ScanSession::new(Arc::clone(&client));

    let ScanError::Api(busy) = session.submit_scan("https://busy.com").await.unwrap_err() else {
        panic!("expected an API error");
    };
    assert!(!auth.handle_rejection(&busy));
    assert_eq!(client.session().token().as_deref(), Some("expired"));

    let ScanError::Api(rejected) = session.submit_scan("https://good.com").await.unwrap_err()
    else {
        panic!("expected an API error");
    };
    assert!(auth.handle_rejection(&rejected));
    assert!(!client.session().is_authenticated());
    assert!(!auth.handle_rejection(&rejected));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn logout_clears_credential_even_when_service_fails() {
    let server = MockServer::start_async().await;
    let logout = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/users/logout")
                .header("authorization", "Bearer tok123");
            then.status(500).json_body(json!({ "message": "try later" }));
        })
        .await;

    let client = client_for(server.base_url());
    client.session().set_token("tok123");
    let auth = Authenticator::new(Arc::clone(&client));

    let err = auth.logout().await.unwrap_err();
    assert_eq!(err.message, "try later");
    assert!(client.session().token().is_none());
    logout.assert_async().await;
}

#[tokio::test]
async fn refresh_replaces_token_and_missing_token_is_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/users/refresh-access-token")
                .header("authorization", "Bearer old");
            then.status(200)
                .json_body(json!({ "data": { "accessToken": "new" } }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/users/refresh-access-token")
                .header("authorization", "Bearer new");
            then.status(200).json_body(json!({ "data": {} }));
        })
        .await;

    let client = client_for(server.base_url());
    client.session().set_token("old");
    let auth = Authenticator::new(Arc::clone(&client));

    auth.refresh().await.unwrap();
    assert_eq!(client.session().token().as_deref(), Some("new"));

    let err = auth.refresh().await.unwrap_err();
    assert_eq!(err.cause, ErrorCause::Decode);
    assert_eq!(client.session().token().as_deref(), Some("new"));
}
