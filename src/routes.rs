use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::billing::{self, PaymentGateway};
use crate::generation::{self, GenAiClient, StockMediaClient};
use crate::profile_store::ProfileStore;
use crate::{auth, usage};

async fn root() -> &'static str {
    "Postwise API"
}

pub fn api_routes() -> Router {
    Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/me", get(auth::me))
        .route("/api/generate", post(generation::generate_posts))
        .route("/api/image", post(generation::generate_image))
        .route("/api/video", post(generation::generate_video))
        .route("/api/usage", get(usage::usage_summary))
        .route("/api/payment", post(billing::create_payment))
}

/// Assembles the full application router with its shared clients. The
/// prometheus layer stays in `main`; everything else lives here so
/// integration tests exercise the same stack the binary serves.
pub fn app(
    store: Arc<ProfileStore>,
    genai: Arc<GenAiClient>,
    stock: Arc<StockMediaClient>,
    gateway: Arc<PaymentGateway>,
) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(api_routes())
        .layer(CorsLayer::permissive())
        .layer(Extension(store))
        .layer(Extension(genai))
        .layer(Extension(stock))
        .layer(Extension(gateway))
}
