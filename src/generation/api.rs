use axum::extract::rejection::JsonRejection;
use axum::{extract::Extension, Json};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;
use crate::profile_store::ProfileStore;
use crate::quota;
use crate::usage;

use super::models::{
    GenerateMode, GenerateRequest, GenerateResponse, ImageRequest, ImageResponse, VideoRequest,
    VideoResponse, TOKENS_PER_IMAGE, TOKENS_PER_TEXT, TOKENS_PER_VIDEO,
};
use super::providers::{GenAiClient, StockMediaClient};
use super::templates;

const TEXT_QUOTA_MESSAGE: &str = "You've used all your tokens. Upgrade your plan to continue.";
const IMAGE_QUOTA_MESSAGE: &str =
    "Insufficient tokens for image generation. Upgrade your plan to continue.";
const VIDEO_QUOTA_MESSAGE: &str =
    "Video reel generation requires 3 tokens. Upgrade your plan to continue.";

fn bad_json(e: JsonRejection) -> AppError {
    AppError::BadRequest(format!("Invalid request: {e}"))
}

/// key: orchestrator-text -> primary provider with deterministic fallback
pub async fn generate_posts(
    Extension(store): Extension<Arc<ProfileStore>>,
    Extension(genai): Extension<Arc<GenAiClient>>,
    AuthUser { id: user_id, .. }: AuthUser,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> AppResult<Json<GenerateResponse>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let params = payload.normalize();

    let profile = quota::admit(&store, &user_id, TOKENS_PER_TEXT, TEXT_QUOTA_MESSAGE).await?;

    // Demo mode short-circuits after admission: fixed samples, nothing
    // billed, nothing recorded.
    if params.mode == GenerateMode::Demo {
        let posts = templates::demo_posts(&params.business_name, params.language, &params.platforms);
        return Ok(Json(GenerateResponse {
            posts,
            mode: "demo",
            debug_error: None,
            tokens_remaining: quota::tokens_remaining(&profile),
        }));
    }

    let (posts, mode, debug_error) = match genai.generate_posts(&params).await {
        Ok(posts) => (posts, "ai", None),
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "text provider failed; using template fallback");
            let posts = templates::template_posts(
                &params.business_name,
                &params.platforms,
                params.language,
                params.num_posts,
            );
            (posts, "template", Some(e.to_string()))
        }
    };

    quota::deduct(&store, &user_id, TOKENS_PER_TEXT).await;
    usage::record(
        &store,
        &user_id,
        "text",
        &params.platforms[0],
        format!(
            "{} | {} | {} posts",
            params.business_name, params.business_type, params.num_posts
        ),
        TOKENS_PER_TEXT,
    )
    .await;

    Ok(Json(GenerateResponse {
        posts,
        mode,
        debug_error,
        tokens_remaining: (quota::tokens_remaining(&profile) - TOKENS_PER_TEXT).max(0),
    }))
}

/// key: orchestrator-image -> no fallback, missing payload is fatal
pub async fn generate_image(
    Extension(store): Extension<Arc<ProfileStore>>,
    Extension(genai): Extension<Arc<GenAiClient>>,
    AuthUser { id: user_id, .. }: AuthUser,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> AppResult<Json<ImageResponse>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let prompt = payload
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("prompt is required".into()))?;
    let platform = payload
        .platform
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "instagram".to_string());
    let style = payload
        .style
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let business_name = payload
        .business_name
        .map(|n| n.trim().to_string())
        .unwrap_or_default();

    if !genai.has_api_key() {
        return Err(AppError::Message("Generation provider key not configured".into()));
    }

    let profile = quota::admit(&store, &user_id, TOKENS_PER_IMAGE, IMAGE_QUOTA_MESSAGE).await?;

    let output = genai
        .generate_image(&prompt, &platform, &business_name, &style)
        .await
        .map_err(|e| AppError::Message(format!("Image generation failed: {e}")))?;

    // A caption alone is not a result; the payload is the product.
    let Some(image_data) = output.data else {
        return Err(AppError::Message(
            "No image returned from the provider. The model may not have generated an image for this prompt.".into(),
        ));
    };

    quota::deduct(&store, &user_id, TOKENS_PER_IMAGE).await;
    usage::record(
        &store,
        &user_id,
        "image",
        &platform,
        prompt.clone(),
        TOKENS_PER_IMAGE,
    )
    .await;

    Ok(Json(ImageResponse {
        image_data,
        mime_type: "image/png".into(),
        alt_text: output.alt_text,
        platform,
        tokens_remaining: (quota::tokens_remaining(&profile) - TOKENS_PER_IMAGE).max(0),
    }))
}

/// key: orchestrator-video -> script is fatal, clip lookup degrades
pub async fn generate_video(
    Extension(store): Extension<Arc<ProfileStore>>,
    Extension(genai): Extension<Arc<GenAiClient>>,
    Extension(stock): Extension<Arc<StockMediaClient>>,
    AuthUser { id: user_id, .. }: AuthUser,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> AppResult<Json<VideoResponse>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let params = payload.normalize();

    if !genai.has_api_key() {
        return Err(AppError::Message("Generation provider key not configured".into()));
    }

    let profile = quota::admit(&store, &user_id, TOKENS_PER_VIDEO, VIDEO_QUOTA_MESSAGE).await?;

    let mut slides = genai
        .generate_script(&params)
        .await
        .map_err(|e| AppError::Message(format!("Script generation failed: {e}")))?;

    for slide in &mut slides {
        slide.video_url = match stock.portrait_clip(&slide.visual_keyword).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    keyword = %slide.visual_keyword,
                    error = %e,
                    "stock clip lookup failed; slide ships without a clip"
                );
                None
            }
        };
    }

    quota::deduct(&store, &user_id, TOKENS_PER_VIDEO).await;
    usage::record(
        &store,
        &user_id,
        "video",
        &params.platform,
        format!(
            "{} | {} | {} reel",
            params.business_name, params.business_type, params.platform
        ),
        TOKENS_PER_VIDEO,
    )
    .await;

    let total_duration = slides.iter().map(|s| s.duration_seconds).sum();
    Ok(Json(VideoResponse {
        slides,
        total_duration,
        platform: params.platform,
        tokens_remaining: (quota::tokens_remaining(&profile) - TOKENS_PER_VIDEO).max(0),
    }))
}
