//! Router assembly.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, credits, health, payments, sessions, webhooks};
use crate::state::AppState;

/// Build the service router.
#[must_use]
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let body_limit = RequestBodyLimitLayer::new(state.config.max_body_bytes);
    let timeout = TimeoutLayer::new(Duration::from_secs(state.config.request_timeout_seconds));

    Router::new()
        .route("/health", get(health::health))
        .route("/v1/accounts", post(accounts::create_account))
        .route("/v1/accounts/me", get(accounts::me))
        .route("/v1/credits/balance", get(credits::balance))
        .route("/v1/credits/entries", get(credits::entries))
        .route("/v1/payments/packages", get(payments::packages))
        .route("/v1/payments/purchase", post(payments::purchase))
        .route("/v1/payments/execute", get(payments::execute))
        .route("/v1/payments/cancel", get(payments::cancel))
        .route("/v1/sessions", post(sessions::create_session))
        .route("/v1/sessions/providers", get(sessions::providers))
        .route("/webhooks/paypal", post(webhooks::paypal_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(body_limit)
        .layer(timeout)
        .with_state(state)
}

/// Build the CORS layer from configured origins; `"*"` allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(parsed)
    }
}
