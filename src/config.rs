//! Artifact locations
//!
//! Every pipeline step reads and writes files at fixed paths below a base
//! directory. The base comes from `CHURN_HOME` (default `.`) and each path can
//! be overridden individually through its own environment variable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const RAW_DATA_REL: &str = "data/raw/WA_Fn-UseC_-Telco-Customer-Churn.csv";
pub const PROCESSED_DATA_REL: &str = "data/processed/churn_processed.csv";
pub const SCALER_REL: &str = "models/scaler.json";
pub const MODEL_REL: &str = "models/churn_model.json";
pub const ATTRIBUTION_IMAGE_REL: &str = "app/feature_attribution.svg";

/// Where each pipeline artifact lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Raw customer table, supplied by the operator
    pub raw_data: PathBuf,
    /// Encoded training table, written by `preprocess`
    pub processed_data: PathBuf,
    /// Fitted scaler, written by `preprocess`
    pub scaler: PathBuf,
    /// Fitted model, written by `train`
    pub model: PathBuf,
    /// Attribution chart, written by `explain`
    pub attribution_image: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        let home = std::env::var("CHURN_HOME").unwrap_or_else(|_| ".".to_string());
        Self::from_env(home)
    }
}

impl ArtifactPaths {
    /// Default layout below `base`, ignoring per-path environment overrides
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            raw_data: base.join(RAW_DATA_REL),
            processed_data: base.join(PROCESSED_DATA_REL),
            scaler: base.join(SCALER_REL),
            model: base.join(MODEL_REL),
            attribution_image: base.join(ATTRIBUTION_IMAGE_REL),
        }
    }

    /// Layout below `base` with `CHURN_*` per-path overrides applied
    pub fn from_env(base: impl AsRef<Path>) -> Self {
        let defaults = Self::under(base);
        let var = |name: &str, fallback: PathBuf| {
            std::env::var(name).map(PathBuf::from).unwrap_or(fallback)
        };
        Self {
            raw_data: var("CHURN_RAW_DATA", defaults.raw_data),
            processed_data: var("CHURN_PROCESSED_DATA", defaults.processed_data),
            scaler: var("CHURN_SCALER", defaults.scaler),
            model: var("CHURN_MODEL", defaults.model),
            attribution_image: var("CHURN_ATTRIBUTION_IMAGE", defaults.attribution_image),
        }
    }
}
