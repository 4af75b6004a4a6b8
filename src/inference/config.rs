//! Risk tier thresholds

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};

/// Probability cut-offs for the risk tiers. Both comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// `probability > high` is high risk
    pub high: f64,
    /// `probability > moderate` is moderate risk
    pub moderate: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 0.6,
            moderate: 0.3,
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> Result<()> {
        let in_unit = |t: f64| (0.0..=1.0).contains(&t);
        if !in_unit(self.high) || !in_unit(self.moderate) || self.moderate > self.high {
            return Err(ChurnError::ValidationError(format!(
                "risk thresholds must satisfy 0 <= moderate <= high <= 1, got moderate={} high={}",
                self.moderate, self.high
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = RiskThresholds::default();
        assert_eq!(t.high, 0.6);
        assert_eq!(t.moderate, 0.3);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let t = RiskThresholds { high: 0.2, moderate: 0.5 };
        assert!(t.validate().is_err());
    }
}
