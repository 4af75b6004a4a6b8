//! Model explainability
//!
//! Sampled Shapley attributions over the booster's log-odds margin,
//! aggregated into a global feature ranking and rendered as a bar chart.

mod attribution;
mod summary;

pub use attribution::{FeatureContribution, LocalExplanation, ShapleySampler};
pub use summary::{AttributionSummary, ExplainStep, FeatureAttribution};

use serde::{Deserialize, Serialize};

/// Settings for the explain step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainConfig {
    /// Rows drawn (without replacement) from the processed dataset
    pub sample_size: usize,
    pub n_permutations: usize,
    /// Features shown in the chart
    pub top_k: usize,
    pub random_state: u64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            n_permutations: 25,
            top_k: 15,
            random_state: 42,
        }
    }
}

impl ExplainConfig {
    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = n.max(1);
        self
    }

    pub fn with_permutations(mut self, n: usize) -> Self {
        self.n_permutations = n.max(1);
        self
    }
}
