//! Rejection logging tests.
//!
//! Runs rejections through the gate with the production default log filter
//! and checks that the specific reason reaches the operator log while the
//! caller only sees `Unauthorized`.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use gate_test_utils::{CapturedLogs, MockJwksServer, TestKeypair, TestTokenBuilder, TEST_AUDIENCE};
use std::sync::Arc;
use std::time::Duration;
use token_gate::auth::{JwksClient, TokenVerifier};
use token_gate::gate::{AuthorizerEvent, EventKind, Gate};
use token_gate::observability::logging::default_env_filter;

const RESOURCE: &str = "arn:aws:execute-api:us-east-1:123456789012:abc123/prod/GET/items";

fn gate_for(idp: &MockJwksServer) -> Gate {
    let jwks_client = Arc::new(JwksClient::new(idp.jwks_url()));
    let verifier = TokenVerifier::new(jwks_client, idp.issuer(), TEST_AUDIENCE, Duration::ZERO);
    Gate::new(Arc::new(verifier))
}

fn token_event(header: Option<String>) -> AuthorizerEvent {
    AuthorizerEvent {
        kind: EventKind::Token,
        authorization_header: header,
        requested_resource: RESOURCE.to_string(),
    }
}

fn assert_rejection_logged(logs: &str, reason: &str) {
    let line = logs
        .lines()
        .find(|l| l.contains("gate.orchestrator") && l.contains("Request rejected"))
        .unwrap_or_else(|| panic!("no rejection line in captured logs: {logs:?}"));
    assert!(line.contains("WARN"), "rejection not logged at warn: {line}");
    assert!(line.contains(reason), "reason {reason} missing from: {line}");
}

#[tokio::test]
async fn test_missing_credential_reason_is_logged() {
    let kp = TestKeypair::new(1, "key-01");
    let idp = MockJwksServer::start(&[&kp]).await;
    let gate = gate_for(&idp);
    let (logs, _guard) = CapturedLogs::install(default_env_filter());

    let rejection = gate.authorize(&token_event(None)).await.unwrap_err();

    assert_eq!(rejection.to_string(), "Unauthorized");
    assert_rejection_logged(&logs.contents(), "missing_credential");
}

#[tokio::test]
async fn test_unknown_kid_is_logged_as_key_unavailable() {
    let published = TestKeypair::new(1, "key-01");
    let unpublished = TestKeypair::new(2, "key-99");
    let idp = MockJwksServer::start(&[&published]).await;
    let gate = gate_for(&idp);
    let (logs, _guard) = CapturedLogs::install(default_env_filter());

    let token = unpublished.sign_token(&TestTokenBuilder::new().issued_by(&idp.issuer()).build());
    let rejection = gate
        .authorize(&token_event(Some(format!("Bearer {}", token))))
        .await
        .unwrap_err();

    assert_eq!(rejection.to_string(), "Unauthorized");
    let contents = logs.contents();
    assert_rejection_logged(&contents, "key_unavailable");
    assert!(contents.contains("gate.auth.jwks"), "resolver log missing: {contents:?}");
}

#[tokio::test]
async fn test_expired_token_is_logged_as_expired() {
    let kp = TestKeypair::new(1, "key-01");
    let idp = MockJwksServer::start(&[&kp]).await;
    let gate = gate_for(&idp);
    let (logs, _guard) = CapturedLogs::install(default_env_filter());

    let token = kp.sign_token(
        &TestTokenBuilder::new()
            .issued_by(&idp.issuer())
            .expires_in(-3600)
            .build(),
    );
    gate.authorize(&token_event(Some(format!("Bearer {}", token))))
        .await
        .unwrap_err();

    assert_rejection_logged(&logs.contents(), "expired");
}

#[tokio::test]
async fn test_allowed_request_logs_no_subject() {
    let kp = TestKeypair::new(1, "key-01");
    let idp = MockJwksServer::start(&[&kp]).await;
    let gate = gate_for(&idp);
    let (logs, _guard) = CapturedLogs::install(default_env_filter());

    let token = kp.sign_token(
        &TestTokenBuilder::new()
            .issued_by(&idp.issuer())
            .for_user("user-secret-42")
            .build(),
    );
    gate.authorize(&token_event(Some(format!("Bearer {}", token))))
        .await
        .unwrap();

    let contents = logs.contents();
    assert!(contents.contains("Request authorized"));
    assert!(!contents.contains("user-secret-42"));
}
