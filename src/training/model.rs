//! The persisted churn model

use super::boosting::BoostedTrees;
use super::config::TrainingConfig;
use super::metrics::EvaluationMetrics;
use crate::error::{ChurnError, PipelineStep, Result};
use crate::export::Artifact;
use crate::schema::FeatureSchema;
use chrono::{DateTime, Utc};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Fitted booster plus the column layout it was trained on.
///
/// Loading rejects any file whose `feature_names` differ from the canonical
/// layout, so a model is never fed vectors it was not trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnModel {
    pub feature_names: Vec<String>,
    pub booster: BoostedTrees,
    pub config: TrainingConfig,
    pub trained_at: DateTime<Utc>,
    pub metrics: EvaluationMetrics,
}

impl ChurnModel {
    pub fn new(booster: BoostedTrees, config: TrainingConfig, metrics: EvaluationMetrics) -> Self {
        Self {
            feature_names: FeatureSchema::canonical().columns().to_vec(),
            booster,
            config,
            trained_at: Utc::now(),
            metrics,
        }
    }

    /// Probability of churn for one encoded vector
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        self.booster.predict_proba_one(ArrayView1::from(features))
    }
}

impl Artifact for ChurnModel {
    const PRODUCER: PipelineStep = PipelineStep::Train;

    fn validate(&self) -> Result<()> {
        FeatureSchema::canonical().validate_columns(&self.feature_names)?;
        if self.booster.n_features() != self.feature_names.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} booster features", self.feature_names.len()),
                actual: format!("{} booster features", self.booster.n_features()),
            });
        }
        Ok(())
    }
}
