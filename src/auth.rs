use axum::extract::rejection::JsonRejection;
use axum::{extract::Extension, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;
use crate::profile_store::{AuthCallError, AuthSession, Principal, ProfileStore};
use crate::quota;

#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct SessionUser {
    pub id: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: SessionUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SessionResponse {
    fn from_session(session: AuthSession, message: Option<String>) -> Self {
        SessionResponse {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            user: SessionUser {
                id: session.user_id,
                email: session.email,
            },
            message,
        }
    }
}

fn map_auth_error(e: AuthCallError) -> AppError {
    match e {
        AuthCallError::Rejected { status, message } => AppError::UpstreamStatus(status, message),
        AuthCallError::Transport(e) => AppError::Upstream(e),
    }
}

fn required_credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String), AppError> {
    let email = email.map(|e| e.trim().to_string()).unwrap_or_default();
    let password = password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("email and password are required".into()));
    }
    Ok((email, password))
}

pub async fn signup(
    Extension(store): Extension<Arc<ProfileStore>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<Json<SessionResponse>> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(format!("Invalid JSON: {e}")))?;
    let (email, password) = required_credentials(payload.email, payload.password)?;
    if password.chars().count() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let session = store
        .signup(&email, &password)
        .await
        .map_err(map_auth_error)?;

    // A DB-side trigger may create the profile row as well; doing it here
    // too keeps first-login behavior correct when the trigger is absent.
    if let Some(user_id) = session.user_id.as_deref() {
        if let Err(e) = store.create_profile(user_id, session.email.as_deref()).await {
            tracing::warn!(user_id, error = %e, "signup profile creation failed");
        }
    }

    Ok(Json(SessionResponse::from_session(
        session,
        Some("Registration successful. Please check your email to confirm your account.".into()),
    )))
}

pub async fn login(
    Extension(store): Extension<Arc<ProfileStore>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<SessionResponse>> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(format!("Invalid JSON: {e}")))?;
    let (email, password) = required_credentials(payload.email, payload.password)?;

    let session = store
        .login(&email, &password)
        .await
        .map_err(map_auth_error)?;
    Ok(Json(SessionResponse::from_session(session, None)))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Requires the credential to be present but deliberately not verified:
/// revoking an already-expired session should still succeed.
pub async fn logout(
    Extension(store): Extension<Arc<ProfileStore>>,
    headers: HeaderMap,
) -> AppResult<Json<LogoutResponse>> {
    let token = crate::extractor::bearer_token(&headers)
        .ok_or_else(|| AppError::BadRequest("Authorization header required".into()))?;

    store.logout(&token).await;
    Ok(Json(LogoutResponse {
        message: "Logged out successfully".into(),
    }))
}

pub async fn refresh(
    Extension(store): Extension<Arc<ProfileStore>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<SessionResponse>> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(format!("Invalid JSON: {e}")))?;
    let refresh_token = payload
        .refresh_token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("refresh_token is required".into()))?;

    let session = store.refresh(&refresh_token).await.map_err(|e| match e {
        AuthCallError::Rejected { status, .. } => {
            AppError::UpstreamStatus(status, "Token refresh failed. Please log in again.".into())
        }
        AuthCallError::Transport(e) => AppError::Upstream(e),
    })?;
    Ok(Json(SessionResponse::from_session(session, None)))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: Option<String>,
    pub plan: String,
    pub tokens_total: i64,
    pub tokens_used: i64,
    pub tokens_remaining: i64,
    pub display_name: Option<String>,
    pub plan_started_at: Option<DateTime<Utc>>,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

pub async fn me(
    Extension(store): Extension<Arc<ProfileStore>>,
    AuthUser { id, email }: AuthUser,
) -> AppResult<Json<MeResponse>> {
    let principal = Principal {
        id: id.clone(),
        email: email.clone(),
    };
    let profile = store
        .ensure_profile(&principal)
        .await
        .map_err(|e| AppError::Message(format!("Profile lookup failed: {e}")))?;

    Ok(Json(MeResponse {
        id,
        email,
        plan: profile.plan.as_str().to_string(),
        tokens_total: profile.tokens_total,
        tokens_used: profile.tokens_used,
        tokens_remaining: quota::tokens_remaining(&profile),
        display_name: profile.display_name,
        plan_started_at: profile.plan_started_at,
        plan_expires_at: profile.plan_expires_at,
        created_at: profile.created_at,
    }))
}
