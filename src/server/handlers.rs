//! Request handlers

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::inference::ChurnPrediction;
use crate::schema::{CustomerRecord, FeatureSchema, LABEL_COLUMN, N_FEATURES};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at());
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.predictor_loaded(),
        "uptime_secs": uptime.num_seconds(),
    }))
}

#[derive(Serialize)]
struct ReferenceCategory {
    field: &'static str,
    reference: &'static str,
}

pub async fn get_schema() -> Json<serde_json::Value> {
    let schema = FeatureSchema::canonical();
    let references: Vec<ReferenceCategory> = schema
        .reference_categories()
        .into_iter()
        .map(|(field, reference)| ReferenceCategory { field, reference })
        .collect();
    Json(json!({
        "n_features": N_FEATURES,
        "columns": schema.columns(),
        "label": LABEL_COLUMN,
        "fields": schema.fields(),
        "reference_categories": references,
    }))
}

/// Score one raw customer record.
///
/// Syntax errors in the body are 400; a missing field, a wrong type or an
/// out-of-domain category is 422.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CustomerRecord>, JsonRejection>,
) -> Result<Json<ChurnPrediction>> {
    let Json(record) = payload.map_err(|rejection| {
        warn!(reason = %rejection.body_text(), "Rejected predict request body");
        ServerError::from(rejection)
    })?;

    let predictor = state.predictor().await?;
    let start = Instant::now();
    let prediction = predictor.predict(&record).map_err(|e| {
        warn!(error = %e, "Prediction failed");
        ServerError::from(e)
    })?;
    info!(
        probability = prediction.probability,
        tier = %prediction.risk_tier,
        latency_us = start.elapsed().as_micros() as u64,
        "Scored customer"
    );
    Ok(Json(prediction))
}

pub async fn get_attribution_summary(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse> {
    let bytes = state.attribution_image().await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], bytes))
}
