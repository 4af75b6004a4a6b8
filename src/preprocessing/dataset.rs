//! The encoded training table
//!
//! On disk: the 30 canonical feature columns in order, then `Churn` as 0/1.

use crate::error::{ChurnError, PipelineStep, Result};
use crate::export::ArtifactStore;
use crate::schema::{FeatureSchema, LABEL_COLUMN, N_FEATURES};
use crate::utils::data_loader::{DataLoader, DataSaver};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Encoded feature matrix with one 0/1 label per row
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDataset {
    pub features: Array2<f64>,
    pub labels: Array1<i64>,
}

impl EncodedDataset {
    pub fn new(features: Array2<f64>, labels: Array1<i64>) -> Result<Self> {
        if features.ncols() != N_FEATURES {
            return Err(ChurnError::ShapeError {
                expected: format!("{} feature columns", N_FEATURES),
                actual: format!("{} feature columns", features.ncols()),
            });
        }
        if features.nrows() != labels.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} labels", features.nrows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if let Some(bad) = labels.iter().find(|&&y| y != 0 && y != 1) {
            return Err(ChurnError::DataError(format!("label must be 0 or 1, got {}", bad)));
        }
        Ok(Self { features, labels })
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    /// `(negatives, positives)`
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&y| y == 1).count();
        (self.labels.len() - positives, positives)
    }

    /// Rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }

    /// Write as CSV with canonical headers and the label last
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let schema = FeatureSchema::canonical();
        let mut columns: Vec<Column> = schema
            .columns()
            .iter()
            .enumerate()
            .map(|(j, name)| {
                Series::new(name.as_str().into(), self.features.column(j).to_vec()).into()
            })
            .collect();
        columns.push(Series::new(LABEL_COLUMN.into(), self.labels.to_vec()).into());

        let mut df = DataFrame::new(columns)?;
        DataSaver::save_csv(&mut df, path)?;
        info!(path = %path.display(), rows = self.n_rows(), "Wrote processed dataset");
        Ok(())
    }

    /// Read a processed CSV, rejecting any header that is not the canonical
    /// layout followed by `Churn`
    pub fn read_csv(path: &Path) -> Result<Self> {
        ArtifactStore::require(path, PipelineStep::Preprocess)?;
        let df = DataLoader::new().load_csv(path)?;

        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        let (label, features) = names
            .split_last()
            .ok_or_else(|| ChurnError::DataError(format!("{} has no columns", path.display())))?;
        if label != LABEL_COLUMN {
            return Err(ChurnError::SchemaMismatch {
                expected: format!("last column {}", LABEL_COLUMN),
                actual: format!("last column {}", label),
            });
        }
        FeatureSchema::canonical().validate_columns(features)?;

        let n = df.height();
        let mut matrix = Array2::<f64>::zeros((n, N_FEATURES));
        for (j, name) in features.iter().enumerate() {
            let cast = df.column(name)?.cast(&DataType::Float64)?;
            let ca = cast.as_materialized_series().f64()?.clone();
            for (i, v) in ca.into_iter().enumerate() {
                matrix[[i, j]] = v.ok_or_else(|| {
                    ChurnError::DataError(format!("missing value in {} at row {}", name, i))
                })?;
            }
        }

        let cast = df.column(LABEL_COLUMN)?.cast(&DataType::Int64)?;
        let labels = cast
            .as_materialized_series()
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| ChurnError::DataError(format!("missing label at row {}", i)))
            })
            .collect::<Result<Vec<i64>>>()?;

        Self::new(matrix, Array1::from_vec(labels))
    }
}
