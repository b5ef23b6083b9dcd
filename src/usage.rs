use axum::{extract::Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;
use crate::profile_store::{
    GenerationEntry, NewGenerationRecord, PaymentEntry, ProfileStore,
};
use crate::quota;

const RECENT_GENERATIONS: usize = 20;
const RECENT_PAYMENTS: usize = 5;

/// Append a generation audit record. Best effort by design: a failed
/// write is a warn-level log and a gap in the audit trail, never a
/// failed user response.
pub async fn record(
    store: &ProfileStore,
    user_id: &str,
    content_type: &str,
    platform: &str,
    prompt_summary: String,
    tokens_consumed: i64,
) {
    let record = NewGenerationRecord {
        user_id: user_id.to_string(),
        content_type: content_type.to_string(),
        platform: platform.to_string(),
        tokens_consumed,
        prompt_summary: truncate_chars(&prompt_summary, 200),
    };
    if let Err(e) = store.insert_generation(&record).await {
        tracing::warn!(
            user_id,
            content_type,
            error = %e,
            "generation audit write failed"
        );
    }
}

/// Char-aware truncation; summaries carry Arabic text, so byte slicing
/// would split codepoints.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[derive(Serialize)]
pub struct UsageResponse {
    pub plan: String,
    pub tokens_total: i64,
    pub tokens_used: i64,
    pub tokens_remaining: i64,
    pub plan_started_at: Option<DateTime<Utc>>,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub generations: Vec<GenerationEntry>,
    pub payments: Vec<PaymentEntry>,
}

pub async fn usage_summary(
    Extension(store): Extension<Arc<ProfileStore>>,
    AuthUser { id: user_id, .. }: AuthUser,
) -> AppResult<Json<UsageResponse>> {
    let profile = store
        .get_profile(&user_id)
        .await
        .map_err(|e| AppError::Message(format!("Profile lookup failed: {e}")))?
        .ok_or_else(|| AppError::NotFound("User profile not found.".into()))?;

    // Both history fetches degrade to empty lists; the summary itself
    // must still be served.
    let generations = store
        .recent_generations(&user_id, RECENT_GENERATIONS)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(%user_id, error = %e, "generation history fetch failed");
            Vec::new()
        });
    let payments = store
        .recent_payments(&user_id, RECENT_PAYMENTS)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(%user_id, error = %e, "payment history fetch failed");
            Vec::new()
        });

    Ok(Json(UsageResponse {
        plan: profile.plan.as_str().to_string(),
        tokens_total: profile.tokens_total,
        tokens_used: profile.tokens_used,
        tokens_remaining: quota::tokens_remaining(&profile),
        plan_started_at: profile.plan_started_at,
        plan_expires_at: profile.plan_expires_at,
        generations,
        payments,
    }))
}
