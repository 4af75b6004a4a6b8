//! Application state management

use super::error::{Result, ServerError};
use super::ServerConfig;
use crate::error::{ChurnError, PipelineStep};
use crate::export::ArtifactStore;
use crate::inference::ChurnPredictor;
use axum::body::Bytes;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Process-wide state shared across handlers.
///
/// Artifacts are loaded on first use and then held for the life of the
/// process. A failed load leaves the cell empty so a later request retries
/// once the artifact exists; a successful load is never repeated.
pub struct AppState {
    pub config: ServerConfig,
    predictor: OnceCell<Arc<ChurnPredictor>>,
    attribution_image: OnceCell<Bytes>,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            predictor: OnceCell::new(),
            attribution_image: OnceCell::new(),
            started_at: chrono::Utc::now(),
        }
    }

    /// State with a predictor already in place
    pub fn with_predictor(config: ServerConfig, predictor: ChurnPredictor) -> Self {
        let state = Self::new(config);
        let _ = state.predictor.set(Arc::new(predictor));
        state
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }

    pub fn predictor_loaded(&self) -> bool {
        self.predictor.initialized()
    }

    /// The loaded predictor, reading the scaler and model on first call
    pub async fn predictor(&self) -> Result<Arc<ChurnPredictor>> {
        self.predictor
            .get_or_try_init(|| async {
                let paths = self.config.paths.clone();
                let predictor = tokio::task::spawn_blocking(move || ChurnPredictor::load(&paths))
                    .await
                    .map_err(|e| ServerError::Internal(format!("artifact loader panicked: {}", e)))??;
                Ok::<_, ServerError>(Arc::new(predictor))
            })
            .await
            .cloned()
    }

    /// The attribution chart, read from disk on first call
    pub async fn attribution_image(&self) -> Result<Bytes> {
        self.attribution_image
            .get_or_try_init(|| async {
                let path = self.config.paths.attribution_image.clone();
                let bytes = tokio::task::spawn_blocking(move || {
                    ArtifactStore::read_bytes(&path, PipelineStep::Explain)
                })
                .await
                .map_err(|e| ServerError::Internal(format!("image loader panicked: {}", e)))?
                .map_err(|e| match e {
                    e @ ChurnError::MissingArtifact { .. } => ServerError::NotFound(e.to_string()),
                    e => ServerError::from(e),
                })?;
                info!(bytes = bytes.len(), "Loaded attribution chart");
                Ok::<_, ServerError>(Bytes::from(bytes))
            })
            .await
            .cloned()
    }
}
