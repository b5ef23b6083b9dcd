use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::read_optional_env;

/// Plan tier stored on a profile. `pro` is unlimited regardless of the
/// token counters; the other tiers are strictly metered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Starter,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Starter => "starter",
            Plan::Pro => "pro",
        }
    }
}

pub const FREE_TOKEN_ALLOWANCE: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default)]
    pub tokens_total: i64,
    #[serde(default)]
    pub tokens_used: i64,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub plan_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub plan_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_customer_ref: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// The defaults a freshly registered account starts with.
    pub fn with_free_defaults(id: String, email: Option<String>) -> Self {
        Profile {
            id,
            email,
            plan: Plan::Free,
            tokens_total: FREE_TOKEN_ALLOWANCE,
            tokens_used: 0,
            display_name: None,
            plan_started_at: None,
            plan_expires_at: None,
            payment_customer_ref: None,
            created_at: None,
        }
    }
}

/// The caller identity resolved from a bearer credential.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub email: Option<String>,
}

/// Session material handed back by the identity service on signup,
/// login or refresh. The service sometimes nests the user under a
/// `session` envelope and sometimes returns it flat, so extraction is
/// tolerant of both shapes.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl AuthSession {
    fn from_value(body: &Value, fallback_email: Option<&str>) -> Self {
        let session = body.get("session").filter(|s| s.is_object());
        let token_source = session.unwrap_or(body);
        let user = body.get("user").filter(|u| u.is_object()).unwrap_or(body);
        AuthSession {
            access_token: str_field(token_source, "access_token"),
            refresh_token: str_field(token_source, "refresh_token"),
            user_id: str_field(user, "id"),
            email: str_field(user, "email").or_else(|| fallback_email.map(str::to_string)),
        }
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

#[derive(Debug, Error)]
pub enum AuthCallError {
    /// The identity service answered with a non-success status.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Audit row appended after a billable generation.
#[derive(Debug, Clone, Serialize)]
pub struct NewGenerationRecord {
    pub user_id: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub platform: String,
    pub tokens_consumed: i64,
    pub prompt_summary: String,
}

/// Payment ledger row. Created `pending`; an out-of-band webhook flips
/// the status once the provider confirms or rejects the charge.
#[derive(Debug, Clone, Serialize)]
pub struct NewPaymentRecord {
    pub user_id: String,
    pub plan: String,
    pub amount: f64,
    pub currency: String,
    pub provider_intent_id: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub tokens_consumed: Option<i64>,
    #[serde(default)]
    pub prompt_summary: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

enum Credential<'a> {
    /// Public key only; used for the auth endpoints.
    Anon,
    /// Privileged service key; row reads and writes.
    Service,
    /// The caller's own bearer token.
    Bearer(&'a str),
}

/// HTTP client for the remote identity/profile service: a bearer-token
/// auth API under `/auth/v1` and a filtered row store under `/rest/v1`.
pub struct ProfileStore {
    base: String,
    service_key: String,
    anon_key: String,
    client: Client,
}

impl ProfileStore {
    pub fn new(
        base: impl Into<String>,
        service_key: impl Into<String>,
        anon_key: impl Into<String>,
    ) -> Self {
        ProfileStore {
            base: base.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            anon_key: anon_key.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("client build"),
        }
    }

    pub fn from_env() -> Self {
        let base =
            std::env::var("PROFILE_SERVICE_URL").expect("PROFILE_SERVICE_URL must be set");
        let service_key = read_optional_env("PROFILE_SERVICE_KEY").unwrap_or_default();
        let anon_key = read_optional_env("PROFILE_ANON_KEY").unwrap_or_default();
        Self::new(base, service_key, anon_key)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        credential: Credential<'_>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}{}", self.base, path);
        let mut req = self
            .client
            .request(method, &url)
            .header("Accept", "application/json");
        req = match credential {
            Credential::Anon => req.header("apikey", &self.anon_key),
            Credential::Service => req
                .header("apikey", &self.service_key)
                .bearer_auth(&self.service_key),
            Credential::Bearer(token) => {
                req.header("apikey", &self.anon_key).bearer_auth(token)
            }
        };
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await
    }

    // ── Identity ──────────────────────────────────────────────────────

    /// Resolves a bearer credential to a principal. `Ok(None)` means the
    /// identity service rejected the credential or returned no id.
    pub async fn verify_token(&self, token: &str) -> Result<Option<Principal>, reqwest::Error> {
        let resp = self
            .send(Method::GET, "/auth/v1/user", &[], None, Credential::Bearer(token))
            .await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body: Value = resp.json().await?;
        let Some(id) = str_field(&body, "id") else {
            return Ok(None);
        };
        Ok(Some(Principal {
            id,
            email: str_field(&body, "email"),
        }))
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<AuthSession, AuthCallError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let resp = self
            .send(Method::POST, "/auth/v1/signup", &[], Some(&body), Credential::Anon)
            .await?;
        let payload = self.auth_payload(resp).await?;
        Ok(AuthSession::from_value(&payload, Some(email)))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthCallError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let resp = self
            .send(
                Method::POST,
                "/auth/v1/token",
                &[("grant_type", "password".to_string())],
                Some(&body),
                Credential::Anon,
            )
            .await?;
        let payload = self.auth_payload(resp).await?;
        Ok(AuthSession::from_value(&payload, Some(email)))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthCallError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let resp = self
            .send(
                Method::POST,
                "/auth/v1/token",
                &[("grant_type", "refresh_token".to_string())],
                Some(&body),
                Credential::Anon,
            )
            .await?;
        let payload = self.auth_payload(resp).await?;
        Ok(AuthSession::from_value(&payload, None))
    }

    /// Best effort: the session is gone from the client's point of view
    /// whether or not the service acknowledges the revocation.
    pub async fn logout(&self, token: &str) {
        if let Err(e) = self
            .send(Method::POST, "/auth/v1/logout", &[], None, Credential::Bearer(token))
            .await
        {
            tracing::warn!(error = %e, "logout call to identity service failed");
        }
    }

    async fn auth_payload(&self, resp: reqwest::Response) -> Result<Value, AuthCallError> {
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(body);
        }
        let message = str_field(&body, "error_description")
            .or_else(|| str_field(&body, "msg"))
            .or_else(|| str_field(&body, "message"))
            .unwrap_or_else(|| "Identity service rejected the request".to_string());
        Err(AuthCallError::Rejected {
            status: StatusCode::from_u16(status.as_u16())
                .unwrap_or(StatusCode::BAD_REQUEST),
            message,
        })
    }

    // ── Profiles ──────────────────────────────────────────────────────

    pub async fn get_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        let resp = self
            .send(
                Method::GET,
                "/rest/v1/profiles",
                &[
                    ("id", format!("eq.{user_id}")),
                    ("limit", "1".to_string()),
                ],
                None,
                Credential::Service,
            )
            .await?
            .error_for_status()?;
        let rows: Vec<Profile> = resp.json().await?;
        Ok(rows.into_iter().next())
    }

    pub async fn create_profile(&self, user_id: &str, email: Option<&str>) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "id": user_id,
            "email": email,
            "plan": "free",
            "tokens_total": FREE_TOKEN_ALLOWANCE,
            "tokens_used": 0,
        });
        self.send(
            Method::POST,
            "/rest/v1/profiles",
            &[],
            Some(&body),
            Credential::Service,
        )
        .await?
        .error_for_status()?;
        Ok(())
    }

    /// Fetch-or-create. When the row is missing a default free-plan row
    /// is written and its defaults are returned directly; the store does
    /// not guarantee read-after-write, so no second fetch is attempted.
    pub async fn ensure_profile(&self, principal: &Principal) -> anyhow::Result<Profile> {
        if let Some(profile) = self.get_profile(&principal.id).await? {
            return Ok(profile);
        }
        if let Err(e) = self
            .create_profile(&principal.id, principal.email.as_deref())
            .await
        {
            tracing::warn!(user_id = %principal.id, error = %e, "profile creation failed");
        }
        Ok(Profile::with_free_defaults(
            principal.id.clone(),
            principal.email.clone(),
        ))
    }

    pub async fn patch_profile(&self, user_id: &str, changes: Value) -> anyhow::Result<()> {
        self.send(
            Method::PATCH,
            "/rest/v1/profiles",
            &[("id", format!("eq.{user_id}"))],
            Some(&changes),
            Credential::Service,
        )
        .await?
        .error_for_status()?;
        Ok(())
    }

    // ── Ledgers ───────────────────────────────────────────────────────

    pub async fn insert_generation(&self, record: &NewGenerationRecord) -> anyhow::Result<()> {
        let body = serde_json::to_value(record)?;
        self.send(
            Method::POST,
            "/rest/v1/generations",
            &[],
            Some(&body),
            Credential::Service,
        )
        .await?
        .error_for_status()?;
        Ok(())
    }

    pub async fn insert_payment(&self, record: &NewPaymentRecord) -> anyhow::Result<()> {
        let body = serde_json::to_value(record)?;
        self.send(
            Method::POST,
            "/rest/v1/payments",
            &[],
            Some(&body),
            Credential::Service,
        )
        .await?
        .error_for_status()?;
        Ok(())
    }

    pub async fn recent_generations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<GenerationEntry>> {
        let resp = self
            .send(
                Method::GET,
                "/rest/v1/generations",
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("order", "created_at.desc".to_string()),
                    ("limit", limit.to_string()),
                    (
                        "select",
                        "id,type,platform,tokens_consumed,prompt_summary,created_at".to_string(),
                    ),
                ],
                None,
                Credential::Service,
            )
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn recent_payments(
        &self,
        user_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<PaymentEntry>> {
        let resp = self
            .send(
                Method::GET,
                "/rest/v1/payments",
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("order", "created_at.desc".to_string()),
                    ("limit", limit.to_string()),
                    ("select", "id,plan,amount,currency,status,created_at".to_string()),
                ],
                None,
                Credential::Service,
            )
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}
