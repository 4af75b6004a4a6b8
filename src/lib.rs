//! Churn Guard - Telco customer churn prediction
//!
//! Offline batch steps turn a raw customer table into a scaled and encoded
//! training set, fit a gradient-boosted churn classifier on a SMOTE-balanced
//! training split, and render a global feature attribution chart. A small
//! HTTP service then scores single raw records with exactly the same encoder.
//!
//! # Modules
//!
//! ## Schema
//! - [`schema`] - The declarative 30-column feature layout and raw records
//!
//! ## Pipeline steps
//! - [`preprocessing`] - Cleaning, min-max scaling, one-hot encoding
//! - [`synthetic`] - SMOTE oversampling of the training split
//! - [`training`] - Stratified split, boosted trees, held-out metrics
//! - [`explainability`] - Sampled Shapley attributions and the summary chart
//!
//! ## Serving
//! - [`inference`] - Single-record scoring and risk tiers
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface
//!
//! ## Infrastructure
//! - [`config`] - Artifact locations
//! - [`export`] - Artifact persistence
//! - [`utils`] - CSV loading and saving

// Core error handling
pub mod error;
pub mod config;

// Feature layout
pub mod schema;

// Pipeline steps
pub mod preprocessing;
pub mod synthetic;
pub mod training;
pub mod explainability;

// Serving
pub mod inference;
pub mod server;
pub mod cli;

// Infrastructure
pub mod export;
pub mod utils;

pub use error::{ChurnError, PipelineStep, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ChurnError, PipelineStep, Result};

    // Configuration
    pub use crate::config::ArtifactPaths;

    // Schema
    pub use crate::schema::{canonical_columns, CustomerRecord, FeatureSchema, N_FEATURES};

    // Preprocessing
    pub use crate::preprocessing::{
        encode, EncodedDataset, FeatureVector, NumericScaler, RecordEncoder, TrainingPreprocessor,
    };

    // Resampling
    pub use crate::synthetic::{ImbalanceCorrector, SMOTE};

    // Training
    pub use crate::training::{
        stratified_split, BoostedTrees, ChurnModel, EvaluationMetrics, Trainer, TrainingConfig,
    };

    // Explainability
    pub use crate::explainability::{AttributionSummary, ExplainConfig, ExplainStep};

    // Inference
    pub use crate::inference::{ChurnPrediction, ChurnPredictor, RiskTier};

    // Export
    pub use crate::export::ArtifactStore;
}
