use axum::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::error::AppError;
use crate::profile_store::ProfileStore;

/// Authenticated caller, resolved by presenting the bearer credential to
/// the remote identity service. Extraction failing short-circuits the
/// handler with a 401 before any other work happens.
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            AppError::Unauthorized("Authentication required. Please log in.".into())
        })?;
        let store = parts
            .extensions
            .get::<Arc<ProfileStore>>()
            .cloned()
            .ok_or_else(|| AppError::Message("profile store not configured".into()))?;
        let principal = store.verify_token(&token).await?.ok_or_else(|| {
            AppError::Unauthorized("Invalid or expired token. Please log in again.".into())
        })?;
        Ok(AuthUser {
            id: principal.id,
            email: principal.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn headers_with_auth(value: Option<&str>) -> HeaderMap {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = value {
            builder = builder.header("Authorization", value);
        }
        builder
            .body(axum::body::Body::empty())
            .unwrap()
            .into_parts()
            .0
            .headers
    }

    #[test]
    fn bearer_token_parsed_from_header() {
        let headers = headers_with_auth(Some("Bearer abc123"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_header_yields_none() {
        let headers = headers_with_auth(None);
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn non_bearer_scheme_yields_none() {
        let headers = headers_with_auth(Some("Basic dXNlcjpwdw=="));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn blank_token_yields_none() {
        let headers = headers_with_auth(Some("Bearer    "));
        assert!(bearer_token(&headers).is_none());
    }
}
