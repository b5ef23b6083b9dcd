use axum::http::StatusCode;
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use serde_json::json;

mod common;
use common::{mock_identity, mock_profile, request, test_app, TOKEN};

const TEXT_MODEL_PATH: &str = "/models/gemini-2.0-flash:generateContent";

fn script_reply(slides: serde_json::Value) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": slides.to_string() }] }
        }]
    })
}

#[tokio::test]
async fn reel_script_with_stock_clips() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    mock_profile(&server, "starter", 10, 1);

    let script = server.mock(|when, then| {
        when.method(POST).path(TEXT_MODEL_PATH);
        then.status(200).json_body(script_reply(json!([
            { "slide": 1, "text_ar": "قهوتك جاهزة", "text_en": "Your coffee awaits",
              "visual_keyword": "coffee shop", "duration_seconds": 3 },
            { "slide": 2, "text_ar": "زورونا اليوم", "text_en": "Visit us today",
              "visual_keyword": "barista", "duration_seconds": 4 }
        ])));
    });
    let stock = server.mock(|when, then| {
        when.method(GET)
            .path("/videos/search")
            .query_param("orientation", "portrait");
        then.status(200).json_body(json!({
            "videos": [{
                "video_files": [
                    { "link": "https://cdn.example/large.mp4", "file_type": "video/mp4", "width": 1920 },
                    { "link": "https://cdn.example/small.mp4", "file_type": "video/mp4", "width": 540 }
                ]
            }]
        }));
    });
    let deduct = server.mock(|when, then| {
        when.method(PATCH)
            .path("/rest/v1/profiles")
            .json_body_partial(r#"{"tokens_used": 4}"#);
        then.status(204);
    });
    let audit = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/generations")
            .json_body_partial(r#"{"type": "video", "tokens_consumed": 3}"#);
        then.status(201);
    });

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/video",
        Some(TOKEN),
        Some(json!({
            "business_name": "Al Noor Cafe",
            "business_type": "restaurant",
            "platform": "TikTok",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let slides = body["slides"].as_array().unwrap();
    assert_eq!(slides.len(), 2);
    // Smallest rendition preferred.
    assert_eq!(slides[0]["video_url"], "https://cdn.example/small.mp4");
    assert_eq!(body["total_duration"], 7);
    assert_eq!(body["platform"], "tiktok");
    assert_eq!(body["tokens_remaining"], 6);
    script.assert();
    stock.assert_hits(2);
    deduct.assert();
    audit.assert();
}

#[tokio::test]
async fn clip_lookup_failure_degrades_to_null() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    mock_profile(&server, "starter", 10, 0);

    server.mock(|when, then| {
        when.method(POST).path(TEXT_MODEL_PATH);
        then.status(200).json_body(script_reply(json!([
            { "slide": 1, "text_en": "Hook", "visual_keyword": "city skyline",
              "duration_seconds": 2 }
        ])));
    });
    server.mock(|when, then| {
        when.method(GET).path("/videos/search");
        then.status(503);
    });
    server.mock(|when, then| {
        when.method(PATCH).path("/rest/v1/profiles");
        then.status(204);
    });
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/generations");
        then.status(201);
    });

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/video",
        Some(TOKEN),
        Some(json!({ "business_name": "Acme" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["slides"][0]["video_url"].is_null());
    assert_eq!(body["total_duration"], 2);
}

#[tokio::test]
async fn wrapped_slides_object_accepted_and_sanitized() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    mock_profile(&server, "starter", 10, 0);

    // Wrapper object, missing slide numbers and keyword on one entry.
    server.mock(|when, then| {
        when.method(POST).path(TEXT_MODEL_PATH);
        then.status(200).json_body(script_reply(json!({
            "slides": [
                { "text_en": "Hook", "duration_seconds": 3 },
                { "text_en": "CTA", "visual_keyword": "hand shake" }
            ]
        })));
    });
    server.mock(|when, then| {
        when.method(GET).path("/videos/search");
        then.status(200).json_body(json!({ "videos": [] }));
    });
    server.mock(|when, then| {
        when.method(PATCH).path("/rest/v1/profiles");
        then.status(204);
    });
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/generations");
        then.status(201);
    });

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/video",
        Some(TOKEN),
        Some(json!({ "business_type": "restaurant" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let slides = body["slides"].as_array().unwrap();
    assert_eq!(slides[0]["slide"], 1);
    assert_eq!(slides[1]["slide"], 2);
    // Keyword defaulted from the business category.
    assert_eq!(slides[0]["visual_keyword"], "restaurant");
    // Missing duration defaulted.
    assert_eq!(slides[1]["duration_seconds"], 3);
    assert!(slides[0]["video_url"].is_null());
}

#[tokio::test]
async fn script_failure_is_fatal_and_unbilled() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    mock_profile(&server, "starter", 10, 0);

    server.mock(|when, then| {
        when.method(POST).path(TEXT_MODEL_PATH);
        then.status(500);
    });
    let deduct = server.mock(|when, then| {
        when.method(PATCH).path("/rest/v1/profiles");
        then.status(204);
    });

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/video",
        Some(TOKEN),
        Some(json!({ "business_name": "Acme" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Script generation failed"));
    deduct.assert_hits(0);
}

#[tokio::test]
async fn three_token_requirement_enforced() {
    let server = MockServer::start_async().await;
    mock_identity(&server);
    // Two tokens left; the reel needs three.
    mock_profile(&server, "starter", 10, 8);

    let script = server.mock(|when, then| {
        when.method(POST).path(TEXT_MODEL_PATH);
        then.status(200);
    });

    let app = test_app(&server);
    let (status, body) = request(
        &app,
        "POST",
        "/api/video",
        Some(TOKEN),
        Some(json!({ "business_name": "Acme" })),
    )
    .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["tokens_required"], 3);
    assert_eq!(body["upgrade_required"], true);
    script.assert_hits(0);
}
