//! Single-record churn scoring
//!
//! The predictor runs raw records through the same [`RecordEncoder`] as the
//! preprocessing step, then maps the model's probability to a risk tier.
//!
//! [`RecordEncoder`]: crate::preprocessing::RecordEncoder

mod config;
mod engine;

pub use config::RiskThresholds;
pub use engine::ChurnPredictor;

use serde::{Deserialize, Serialize};

/// Coarse churn risk derived from the predicted probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    High,
    Moderate,
    Low,
}

impl RiskTier {
    pub fn from_probability(probability: f64, thresholds: &RiskThresholds) -> Self {
        if probability > thresholds.high {
            RiskTier::High
        } else if probability > thresholds.moderate {
            RiskTier::Moderate
        } else {
            RiskTier::Low
        }
    }

    /// Retention action shown alongside the score
    pub fn recommendation(&self) -> Option<&'static str> {
        match self {
            RiskTier::High => {
                Some("Immediate intervention required. Offer 12-month contract discount.")
            }
            RiskTier::Moderate => Some("Monitor usage frequency."),
            RiskTier::Low => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::High => "HIGH RISK",
            RiskTier::Moderate => "MODERATE RISK",
            RiskTier::Low => "LOW RISK",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Scored record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnPrediction {
    /// Probability of churn in `[0, 1]`
    pub probability: f64,
    pub risk_tier: RiskTier,
    pub recommendation: Option<String>,
}

impl ChurnPrediction {
    pub fn new(probability: f64, thresholds: &RiskThresholds) -> Self {
        let risk_tier = RiskTier::from_probability(probability, thresholds);
        Self {
            probability,
            risk_tier,
            recommendation: risk_tier.recommendation().map(str::to_string),
        }
    }
}
