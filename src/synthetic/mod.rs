//! Imbalance correction
//!
//! Oversamplers take a [`TrainSplit`] and return a larger one. They have no
//! entry point for held-out data.

mod smote;

pub use smote::SMOTE;

use crate::error::Result;
use crate::training::TrainSplit;
use serde::Serialize;

/// Class counts before and after resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResampleSummary {
    /// `(negatives, positives)` of the input split
    pub before: (usize, usize),
    /// `(negatives, positives)` of the output split
    pub after: (usize, usize),
    pub minority_class: i64,
    pub n_synthetic: usize,
}

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    pub train: TrainSplit,
    pub summary: ResampleSummary,
}

/// Synthesizes minority rows until the training classes balance
pub trait ImbalanceCorrector: Send + Sync {
    fn resample(&self, train: &TrainSplit) -> Result<ResampleResult>;
}
