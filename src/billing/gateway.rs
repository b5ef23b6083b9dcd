use anyhow::anyhow;
use axum::http::StatusCode;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{
    read_optional_env, PAYMENT_TOKEN_REFRESH_LEAD_SECS, PAYMENT_TOKEN_TTL_SECS,
};

const DEFAULT_PAYMENT_URL: &str = "https://api.airwallex.com";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The payment provider answered with a non-success status; that
    /// status is surfaced to the caller as-is.
    #[error("Payment service error: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// key: payment-gateway -> intent creation + credential cache
///
/// The provider requires a short-lived bearer token obtained via a
/// client-credential login. The token is cached process-wide behind a
/// mutex and refreshed `refresh_lead` before it would expire, so
/// concurrent workers share one credential instead of racing logins.
pub struct PaymentGateway {
    base: String,
    client_id: String,
    api_key: String,
    client: Client,
    token_cache: Mutex<Option<CachedToken>>,
    token_ttl: Duration,
    refresh_lead: Duration,
}

impl PaymentGateway {
    pub fn new(
        base: impl Into<String>,
        client_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        PaymentGateway {
            base: base.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            api_key: api_key.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .expect("client build"),
            token_cache: Mutex::new(None),
            token_ttl: Duration::from_secs(*PAYMENT_TOKEN_TTL_SECS),
            refresh_lead: Duration::from_secs(*PAYMENT_TOKEN_REFRESH_LEAD_SECS),
        }
    }

    pub fn from_env() -> Self {
        let base = read_optional_env("PAYMENT_API_URL")
            .unwrap_or_else(|| DEFAULT_PAYMENT_URL.to_string());
        let client_id = read_optional_env("PAYMENT_CLIENT_ID").unwrap_or_default();
        let api_key = read_optional_env("PAYMENT_API_KEY").unwrap_or_default();
        Self::new(base, client_id, api_key)
    }

    /// Returns a usable bearer token, logging in only when the cached
    /// one is absent or inside the refresh lead window.
    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut cache = self.token_cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.expires_at > Instant::now() + self.refresh_lead {
                return Ok(cached.token.clone());
            }
        }

        let url = format!("{}/api/v1/authentication/login", self.base);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-client-id", &self.client_id)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("payment login response missing token"))?
            .to_string();

        *cache = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + self.token_ttl,
        });
        Ok(token)
    }

    pub async fn create_intent(
        &self,
        amount: f64,
        currency: &str,
        description: &str,
        merchant_order_id: &str,
        return_url: &str,
        metadata: Value,
    ) -> Result<PaymentIntent, GatewayError> {
        let token = self.access_token().await?;
        let url = format!("{}/api/v1/pa/payment_intents/create", self.base);
        let payload = json!({
            "request_id": Uuid::new_v4().to_string(),
            "amount": amount,
            "currency": currency,
            "merchant_order_id": merchant_order_id,
            "descriptor": description,
            "return_url": return_url,
            "metadata": metadata,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            });
        }
        Ok(resp.json().await.map_err(GatewayError::Transport)?)
    }
}
