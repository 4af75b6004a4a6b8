//! Min-max scaling of the three continuous fields

use crate::error::{ChurnError, PipelineStep, Result};
use crate::export::Artifact;
use crate::schema::{N_NUMERIC, NUMERIC_FIELDS};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fitted min-max scaler for `tenure`, `MonthlyCharges` and `TotalCharges`.
///
/// Fitted once on the full training corpus and persisted; inference only
/// loads it. Values outside the fitted range extrapolate, nothing is clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaler {
    columns: Vec<String>,
    min: Vec<f64>,
    max: Vec<f64>,
}

impl NumericScaler {
    /// Compute per-column `(min, max)` over the fit corpus
    pub fn fit(values: &[[f64; N_NUMERIC]]) -> Result<Self> {
        if values.is_empty() {
            return Err(ChurnError::DataError(
                "cannot fit scaler on an empty corpus".to_string(),
            ));
        }

        let mut min = [f64::INFINITY; N_NUMERIC];
        let mut max = [f64::NEG_INFINITY; N_NUMERIC];
        for (row_idx, row) in values.iter().enumerate() {
            for (slot, &x) in row.iter().enumerate() {
                if !x.is_finite() {
                    return Err(ChurnError::DataError(format!(
                        "non-finite {} at row {}",
                        NUMERIC_FIELDS[slot], row_idx
                    )));
                }
                min[slot] = min[slot].min(x);
                max[slot] = max[slot].max(x);
            }
        }

        let scaler = Self {
            columns: NUMERIC_FIELDS.iter().map(|c| c.to_string()).collect(),
            min: min.to_vec(),
            max: max.to_vec(),
        };
        for slot in scaler.constant_columns() {
            warn!(
                column = NUMERIC_FIELDS[slot],
                value = min[slot],
                "Constant column in fit corpus; scaling reduces to x - min"
            );
        }
        Ok(scaler)
    }

    /// `(x - min) / (max - min)` per column. A zero range divides by 1.
    pub fn transform(&self, x: [f64; N_NUMERIC]) -> [f64; N_NUMERIC] {
        let mut out = [0.0; N_NUMERIC];
        for slot in 0..N_NUMERIC {
            out[slot] = (x[slot] - self.min[slot]) / self.range(slot);
        }
        out
    }

    fn range(&self, slot: usize) -> f64 {
        let range = self.max[slot] - self.min[slot];
        if range == 0.0 {
            1.0
        } else {
            range
        }
    }

    /// Slots whose fitted range is zero
    pub fn constant_columns(&self) -> Vec<usize> {
        (0..N_NUMERIC)
            .filter(|&slot| self.max[slot] == self.min[slot])
            .collect()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Fitted `(min, max)` for one column
    pub fn bounds(&self, column: &str) -> Option<(f64, f64)> {
        let slot = self.columns.iter().position(|c| c == column)?;
        Some((self.min[slot], self.max[slot]))
    }

    /// Check a deserialized state before use
    pub fn validate(&self) -> Result<()> {
        if self.columns.len() != N_NUMERIC
            || self.min.len() != N_NUMERIC
            || self.max.len() != N_NUMERIC
        {
            return Err(ChurnError::ShapeError {
                expected: format!("{} scaler columns", N_NUMERIC),
                actual: format!(
                    "{} columns, {} minima, {} maxima",
                    self.columns.len(),
                    self.min.len(),
                    self.max.len()
                ),
            });
        }
        if self.columns.iter().zip(NUMERIC_FIELDS).any(|(a, e)| a != e) {
            return Err(ChurnError::SchemaMismatch {
                expected: NUMERIC_FIELDS.join(", "),
                actual: self.columns.join(", "),
            });
        }
        for slot in 0..N_NUMERIC {
            let (lo, hi) = (self.min[slot], self.max[slot]);
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(ChurnError::ValidationError(format!(
                    "invalid bounds for {}: min={}, max={}",
                    self.columns[slot], lo, hi
                )));
            }
        }
        Ok(())
    }
}

impl Artifact for NumericScaler {
    const PRODUCER: PipelineStep = PipelineStep::Preprocess;

    fn validate(&self) -> Result<()> {
        NumericScaler::validate(self)
    }
}
