//! Training
//!
//! A stratified split keeps a naturally imbalanced held-out set. SMOTE
//! balances the training side only, a gradient-boosted tree ensemble with
//! fixed hyperparameters is fitted on it, and metrics come from the
//! held-out set.

mod boosting;
mod config;
mod engine;
mod metrics;
mod model;
mod split;

pub use boosting::BoostedTrees;
pub use config::{BoosterConfig, TrainingConfig};
pub use engine::{Trainer, TrainingReport};
pub use metrics::{roc_auc, ConfusionMatrix, EvaluationMetrics};
pub use model::ChurnModel;
pub use split::{stratified_split, HeldOutSplit, TrainSplit};
