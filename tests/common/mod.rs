#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use httpmock::MockServer;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use postwise::billing::PaymentGateway;
use postwise::generation::{GenAiClient, StockMediaClient};
use postwise::profile_store::ProfileStore;
use postwise::routes;

pub const TOKEN: &str = "caller-token";
pub const USER_ID: &str = "user-1";
pub const EMAIL: &str = "user@example.com";

/// Full application router with every collaborator pointed at the same
/// mock server (paths keep the collaborators apart).
pub fn test_app(server: &MockServer) -> Router {
    let base = server.base_url();
    let store = Arc::new(ProfileStore::new(base.clone(), "service-key", "anon-key"));
    let genai = Arc::new(GenAiClient::new(base.clone(), "genai-key"));
    let stock = Arc::new(StockMediaClient::new(base.clone(), Some("stock-key".into())));
    let gateway = Arc::new(PaymentGateway::new(base, "client-id", "api-key"));
    routes::app(store, genai, stock, gateway)
}

pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

/// Identity service accepting `TOKEN` for `USER_ID`.
pub fn mock_identity(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path("/auth/v1/user")
            .header("authorization", format!("Bearer {TOKEN}"));
        then.status(200)
            .json_body(serde_json::json!({ "id": USER_ID, "email": EMAIL }));
    })
}

/// Profile row fetch for `USER_ID`.
pub fn mock_profile<'a>(
    server: &'a MockServer,
    plan: &str,
    tokens_total: i64,
    tokens_used: i64,
) -> httpmock::Mock<'a> {
    let row = serde_json::json!([{
        "id": USER_ID,
        "email": EMAIL,
        "plan": plan,
        "tokens_total": tokens_total,
        "tokens_used": tokens_used,
    }]);
    server.mock(move |when, then| {
        when.method(httpmock::Method::GET)
            .path("/rest/v1/profiles")
            .query_param("id", format!("eq.{USER_ID}"));
        then.status(200).json_body(row.clone());
    })
}
