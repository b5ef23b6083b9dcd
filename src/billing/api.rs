use axum::extract::rejection::JsonRejection;
use axum::{extract::Extension, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::PAYMENT_RETURN_URL;
use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;
use crate::profile_store::{NewPaymentRecord, ProfileStore};

use super::gateway::{GatewayError, PaymentGateway};
use super::plans::{self, PlanDefinition};

#[derive(Deserialize)]
pub struct PaymentRequest {
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub return_url: Option<String>,
}

/// `tokens_granted` is a count for metered plans and the literal string
/// "unlimited" for the sentinel allowance.
#[derive(Serialize)]
#[serde(untagged)]
pub enum TokensGranted {
    Limited(i64),
    Unlimited(&'static str),
}

impl From<&PlanDefinition> for TokensGranted {
    fn from(plan: &PlanDefinition) -> Self {
        if plan.is_unlimited() {
            TokensGranted::Unlimited("unlimited")
        } else {
            TokensGranted::Limited(plan.tokens_total)
        }
    }
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub intent_id: String,
    pub client_secret: String,
    pub currency: String,
    pub amount: f64,
    pub order_id: String,
    pub plan: String,
    pub tokens_granted: TokensGranted,
}

fn map_gateway_error(e: GatewayError) -> AppError {
    match e {
        GatewayError::Rejected { status, body } => {
            AppError::UpstreamStatus(status, format!("Payment service error: {body}"))
        }
        GatewayError::Transport(e) => AppError::Upstream(e),
        GatewayError::Other(e) => AppError::Message(format!("Server error: {e}")),
    }
}

/// key: billing-intent -> optimistic grant before confirmation
///
/// The plan is activated the moment the provider issues an intent, not
/// when the charge settles: the matching PaymentRecord stays `pending`
/// until the (external) webhook reconciles it. An unpaid intent can
/// therefore leave a granted plan behind; that trade is deliberate.
pub async fn create_payment(
    Extension(store): Extension<Arc<ProfileStore>>,
    Extension(gateway): Extension<Arc<PaymentGateway>>,
    AuthUser { id: user_id, email }: AuthUser,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> AppResult<Json<PaymentResponse>> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(format!("Invalid request: {e}")))?;
    let requested = payload.plan.unwrap_or_else(|| "starter".to_string());
    let Some(plan) = plans::resolve(&requested) else {
        return Err(AppError::BadRequest(format!(
            "Unknown plan: '{requested}'. Valid plans: {}.",
            plans::PURCHASABLE_NAMES
        )));
    };

    let return_url = payload
        .return_url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| PAYMENT_RETURN_URL.clone());
    let order_id = format!(
        "{}-{}-{}",
        plan.order_prefix,
        Utc::now().timestamp(),
        &Uuid::new_v4().simple().to_string()[..6]
    );

    let intent = gateway
        .create_intent(
            plan.amount,
            plan.currency,
            plan.description,
            &order_id,
            &return_url,
            json!({
                "product": "postwise",
                "plan": plan.plan.as_str(),
                "user_id": user_id.clone(),
                "user_email": email,
            }),
        )
        .await
        .map_err(map_gateway_error)?;

    // Optimistic grant: activate now so the buyer can generate
    // immediately; the webhook settles the record later. The grant
    // itself is best-effort — the intent already exists, and failing
    // the purchase response here would strand a created intent.
    let mut changes = json!({
        "plan": plan.plan.as_str(),
        "tokens_total": plan.tokens_total,
        "tokens_used": 0,
        "updated_at": "now()",
    });
    if let Some(days) = plan.expires_days {
        changes["plan_expires_at"] = json!((Utc::now() + Duration::days(days)).to_rfc3339());
    }
    if let Err(e) = store.patch_profile(&user_id, changes).await {
        tracing::warn!(%user_id, plan = plan.plan.as_str(), error = %e, "optimistic plan grant failed");
    }

    let record = NewPaymentRecord {
        user_id: user_id.clone(),
        plan: plan.plan.as_str().to_string(),
        amount: plan.amount,
        currency: plan.currency.to_string(),
        provider_intent_id: Some(intent.id.clone()),
        status: "pending".to_string(),
    };
    if let Err(e) = store.insert_payment(&record).await {
        tracing::warn!(%user_id, intent_id = %intent.id, error = %e, "payment record write failed");
    }

    Ok(Json(PaymentResponse {
        intent_id: intent.id,
        client_secret: intent.client_secret,
        currency: plan.currency.to_string(),
        amount: plan.amount,
        order_id,
        plan: plan.plan.as_str().to_string(),
        tokens_granted: plan.into(),
    }))
}
