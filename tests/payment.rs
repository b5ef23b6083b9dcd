use axum::http::StatusCode;
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use serde_json::json;

mod common;
use common::{mock_identity, request, test_app, TOKEN};

fn mock_gateway_login(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/authentication/login")
            .header("x-api-key", "api-key")
            .header("x-client-id", "client-id");
        then.status(200).json_body(json!({ "token": "gateway-token" }));
    })
}

fn mock_intent_create(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/pa/payment_intents/create")
            .header("authorization", "Bearer gateway-token");
        then.status(200).json_body(json!({
            "id": "int_123",
            "client_secret": "cs_456",
            "status": "REQUIRES_PAYMENT_METHOD",
        }));
    })
}

#[tokio::test]
async fn pro_purchase_grants_plan_before_confirmation() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    let login = mock_gateway_login(&server);
    let intent = mock_intent_create(&server);

    let grant = server.mock(|when, then| {
        when.method(PATCH)
            .path("/rest/v1/profiles")
            .query_param("id", "eq.user-1")
            .json_body_partial(r#"{"plan": "pro", "tokens_used": 0, "tokens_total": 999999}"#);
        then.status(204);
    });
    let ledger = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/payments")
            .json_body_partial(r#"{"plan": "pro", "status": "pending", "provider_intent_id": "int_123"}"#);
        then.status(201);
    });

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/payment",
        Some(TOKEN),
        Some(json!({ "plan": "pro", "return_url": "https://app.example/done" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent_id"], "int_123");
    assert_eq!(body["client_secret"], "cs_456");
    assert_eq!(body["amount"], 99.0);
    assert_eq!(body["currency"], "SAR");
    assert_eq!(body["plan"], "pro");
    assert_eq!(body["tokens_granted"], "unlimited");
    assert!(body["order_id"].as_str().unwrap().starts_with("PRO-"));

    login.assert();
    intent.assert();
    // The grant lands even though the payment record is still pending.
    grant.assert();
    ledger.assert();
}

#[tokio::test]
async fn starter_purchase_grants_ten_tokens() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    mock_gateway_login(&server);
    mock_intent_create(&server);

    let grant = server.mock(|when, then| {
        when.method(PATCH)
            .path("/rest/v1/profiles")
            .json_body_partial(r#"{"plan": "starter", "tokens_total": 10, "tokens_used": 0}"#);
        then.status(204);
    });
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/payments");
        then.status(201);
    });

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/payment",
        Some(TOKEN),
        Some(json!({ "plan": "starter" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokens_granted"], 10);
    assert_eq!(body["amount"], 10.0);
    assert!(body["order_id"].as_str().unwrap().starts_with("STR-"));
    grant.assert();
}

#[tokio::test]
async fn legacy_alias_resolves_to_starter() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    mock_gateway_login(&server);
    mock_intent_create(&server);
    server.mock(|when, then| {
        when.method(PATCH).path("/rest/v1/profiles");
        then.status(204);
    });
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/payments");
        then.status(201);
    });

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/payment",
        Some(TOKEN),
        Some(json!({ "plan": "ppu" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "starter");
    assert_eq!(body["tokens_granted"], 10);
}

#[tokio::test]
async fn unknown_plan_rejected_with_catalog() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    let login = mock_gateway_login(&server);

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/payment",
        Some(TOKEN),
        Some(json!({ "plan": "enterprise" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Unknown plan: 'enterprise'"));
    assert!(error.contains("starter, pro, ppu"));
    login.assert_hits(0);
}

#[tokio::test]
async fn gateway_token_cached_across_purchases() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    let login = mock_gateway_login(&server);
    let intent = mock_intent_create(&server);
    server.mock(|when, then| {
        when.method(PATCH).path("/rest/v1/profiles");
        then.status(204);
    });
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/payments");
        then.status(201);
    });

    let app = test_app(&server);
    for _ in 0..2 {
        let (status, _) = request(
            &app,
            "POST",
            "/api/payment",
            Some(TOKEN),
            Some(json!({ "plan": "starter" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    intent.assert_hits(2);
    // One login serves both intents while the cached token is fresh.
    login.assert_hits(1);
}

#[tokio::test]
async fn provider_rejection_status_passed_through() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    mock_gateway_login(&server);
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/pa/payment_intents/create");
        then.status(402).body("card network unavailable");
    });
    let grant = server.mock(|when, then| {
        when.method(PATCH).path("/rest/v1/profiles");
        then.status(204);
    });

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/payment",
        Some(TOKEN),
        Some(json!({ "plan": "pro" })),
    )
    .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["error"].as_str().unwrap().contains("Payment service error"));
    // No intent, no grant.
    grant.assert_hits(0);
}

#[tokio::test]
async fn grant_write_failure_does_not_void_the_purchase() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    mock_gateway_login(&server);
    mock_intent_create(&server);
    server.mock(|when, then| {
        when.method(PATCH).path("/rest/v1/profiles");
        then.status(503);
    });
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/payments");
        then.status(201);
    });

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/payment",
        Some(TOKEN),
        Some(json!({ "plan": "pro" })),
    )
    .await;

    // The intent already exists at the provider; the response reflects it.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent_id"], "int_123");
}
