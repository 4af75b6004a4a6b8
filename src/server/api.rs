//! API route definitions

use std::sync::Arc;
use axum::{
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::warn;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{handlers, state::AppState};
use crate::error::{ChurnError, Result};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "message": "Not found. See /api/health and /api/schema.",
        })),
    )
}

async fn handle_405() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "error": true,
            "message": "Method not allowed. Check the API documentation for supported methods.",
        })),
    )
}

/// CORS policy for the configured origin; unset or `*` allows any origin
pub(super) fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let layer = match origin {
        None | Some("") | Some("*") => CorsLayer::new().allow_origin(Any),
        Some(origin) => {
            let value = origin.parse::<HeaderValue>().map_err(|_| {
                ChurnError::ValidationError(format!("CORS_ORIGIN is not a valid origin: {:?}", origin))
            })?;
            CorsLayer::new().allow_origin(value)
        }
    };
    Ok(layer.allow_methods(Any).allow_headers(Any))
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/schema", get(handlers::get_schema))
        .route("/predict", post(handlers::predict))
        .route("/explain/summary", get(handlers::get_attribution_summary))
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405);

    // Invalid origin: no cross-origin access
    let cors = cors_layer(state.config.cors_origin.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Rejecting all cross-origin requests");
        CorsLayer::new()
    });

    Router::new()
        .nest("/api", api_routes)
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
