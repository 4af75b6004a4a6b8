//! Error types for the server

use crate::error::ChurnError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Well-formed JSON whose values the encoder refuses
    #[error("Rejected input: {0}")]
    Unprocessable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A model artifact the endpoint needs has not been produced yet
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ChurnError> for ServerError {
    fn from(err: ChurnError) -> Self {
        match err {
            e if e.is_rejected_input() => ServerError::Unprocessable(e.to_string()),
            e @ ChurnError::MissingArtifact { .. } => ServerError::Unavailable(e.to_string()),
            e => ServerError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Parsed but the wrong shape: missing field, wrong type
            JsonRejection::JsonDataError(e) => ServerError::Unprocessable(e.body_text()),
            other => ServerError::BadRequest(other.body_text()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Unavailable(msg) => {
                tracing::warn!(detail = %msg, "Artifact unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
