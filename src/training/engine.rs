//! Training engine
//!
//! load → split → resample (train side only) → fit → evaluate (held-out) → persist

use super::boosting::BoostedTrees;
use super::config::TrainingConfig;
use super::metrics::EvaluationMetrics;
use super::model::ChurnModel;
use super::split::{stratified_split, HeldOutSplit, TrainSplit};
use crate::config::ArtifactPaths;
use crate::error::Result;
use crate::export::ArtifactStore;
use crate::preprocessing::EncodedDataset;
use crate::schema::FeatureSchema;
use crate::synthetic::{ImbalanceCorrector, ResampleSummary, SMOTE};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub metrics: EvaluationMetrics,
    pub resampling: ResampleSummary,
    /// `(negatives, positives)` of the held-out split
    pub held_out_counts: (usize, usize),
    /// `(column, share of splits)`, most used first
    pub top_features: Vec<(String, f64)>,
    pub recall_target: f64,
    pub training_time_secs: f64,
}

impl TrainingReport {
    pub fn meets_recall_target(&self) -> bool {
        self.metrics.recall >= self.recall_target
    }
}

/// Fits and evaluates the churn model
pub struct Trainer {
    config: TrainingConfig,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainingConfig::default())
    }
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Read the processed dataset, train, evaluate and persist the model
    pub fn run(&self, paths: &ArtifactPaths) -> Result<TrainingReport> {
        let dataset = EncodedDataset::read_csv(&paths.processed_data)?;
        info!(
            path = %paths.processed_data.display(),
            rows = dataset.n_rows(),
            "Loaded processed dataset"
        );

        let (model, report) = self.fit_evaluate(&dataset)?;
        ArtifactStore::save(&paths.model, &model)?;
        Ok(report)
    }

    /// Split, resample the training side, fit, and evaluate on the held-out
    /// side. Any failure aborts the run.
    pub fn fit_evaluate(&self, dataset: &EncodedDataset) -> Result<(ChurnModel, TrainingReport)> {
        let start = Instant::now();
        let (train, held_out) =
            stratified_split(dataset, self.config.test_size, self.config.random_state)?;

        let smote = SMOTE::new()
            .with_k_neighbors(self.config.k_neighbors)
            .with_seed(self.config.random_state);
        let resampled = smote.resample(&train)?;

        let booster = self.fit_booster(&resampled.train)?;
        let metrics = self.evaluate(&booster, &held_out)?;

        let report = TrainingReport {
            top_features: top_features(&booster, 10),
            metrics: metrics.clone(),
            resampling: resampled.summary,
            held_out_counts: held_out.data().class_counts(),
            recall_target: self.config.recall_target,
            training_time_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            roc_auc = ?metrics.roc_auc,
            "Held-out evaluation"
        );
        if !report.meets_recall_target() {
            warn!(
                recall = metrics.recall,
                target = self.config.recall_target,
                "Recall below target; missed churners are the costlier error"
            );
        }

        let model = ChurnModel::new(booster, self.config.clone(), metrics);
        Ok((model, report))
    }

    fn fit_booster(&self, train: &TrainSplit) -> Result<BoostedTrees> {
        let data = train.data();
        let mut booster = BoostedTrees::new(self.config.booster.clone());
        let start = Instant::now();
        booster.fit(&data.features, &data.labels)?;
        info!(
            n_trees = booster.n_trees(),
            rows = data.n_rows(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Fitted booster"
        );
        Ok(booster)
    }

    fn evaluate(&self, booster: &BoostedTrees, held_out: &HeldOutSplit) -> Result<EvaluationMetrics> {
        let data = held_out.data();
        let proba = booster.predict_proba(&data.features)?;
        EvaluationMetrics::compute(&data.labels, &proba, 0.5)
    }
}

fn top_features(booster: &BoostedTrees, k: usize) -> Vec<(String, f64)> {
    let Some(importances) = booster.feature_importances() else {
        return Vec::new();
    };
    let columns = FeatureSchema::canonical().columns();
    let mut ranked: Vec<(String, f64)> = columns
        .iter()
        .cloned()
        .zip(importances.iter().copied())
        .filter(|(_, share)| *share > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}
