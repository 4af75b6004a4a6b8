//! Batch preprocessing: raw customer table to encoded dataset plus scaler

use super::dataset::EncodedDataset;
use super::encoder::RecordEncoder;
use super::imputer::{parse_strict, repair_with_median, RepairReport};
use super::scaler::NumericScaler;
use crate::config::ArtifactPaths;
use crate::error::{ChurnError, PipelineStep, Result};
use crate::export::ArtifactStore;
use crate::schema::{
    CustomerRecord, FeatureSchema, FieldRule, LabeledRecord, LABEL_COLUMN, LABEL_NEGATIVE,
    LABEL_POSITIVE,
};
use crate::utils::data_loader::DataLoader;
use ndarray::Array1;
use polars::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Summary of a preprocessing run
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessReport {
    pub rows: usize,
    pub churned: usize,
    pub total_charges: RepairReport,
    pub constant_columns: Vec<String>,
    pub elapsed_secs: f64,
}

/// Turns the raw table into the encoded dataset and fitted scaler
pub struct TrainingPreprocessor {
    paths: ArtifactPaths,
}

impl TrainingPreprocessor {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    /// Run the step end to end and persist both outputs
    pub fn run(&self) -> Result<PreprocessReport> {
        let start = Instant::now();
        ArtifactStore::require(&self.paths.raw_data, PipelineStep::SourceData)?;

        let raw = DataLoader::text().load_csv(&self.paths.raw_data)?;
        info!(rows = raw.height(), cols = raw.width(), "Loaded raw customer table");

        let (records, repair) = read_records(&raw)?;
        let (dataset, scaler) = encode_corpus(&records)?;

        dataset.write_csv(&self.paths.processed_data)?;
        ArtifactStore::save(&self.paths.scaler, &scaler)?;

        let (_, churned) = dataset.class_counts();
        let report = PreprocessReport {
            rows: dataset.n_rows(),
            churned,
            total_charges: repair,
            constant_columns: scaler
                .constant_columns()
                .into_iter()
                .map(|slot| scaler.columns()[slot].clone())
                .collect(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            rows = report.rows,
            churned = report.churned,
            elapsed_secs = report.elapsed_secs,
            "Preprocessing complete"
        );
        Ok(report)
    }
}

/// Fit the scaler on every record, then encode every record with it
pub fn encode_corpus(records: &[LabeledRecord]) -> Result<(EncodedDataset, NumericScaler)> {
    let numeric: Vec<[f64; 3]> = records.iter().map(|r| r.record.numeric()).collect();
    let scaler = NumericScaler::fit(&numeric)?;
    info!(rows = numeric.len(), "Fitted numeric scaler on full corpus");

    let raw: Vec<CustomerRecord> = records.iter().map(|r| r.record.clone()).collect();
    let features = RecordEncoder::new(&scaler).encode_all(&raw)?;
    let labels = Array1::from_iter(records.iter().map(|r| i64::from(r.churned)));

    Ok((EncodedDataset::new(features, labels)?, scaler))
}

/// Build labeled records from the raw table (all columns as text).
///
/// `TotalCharges` is repaired with the whole-table median. The identifier
/// column is never read.
pub fn read_records(raw: &DataFrame) -> Result<(Vec<LabeledRecord>, RepairReport)> {
    let n = raw.height();
    let tenure = parse_strict(raw, "tenure")?;
    let monthly = parse_strict(raw, "MonthlyCharges")?;
    let (total, repair) = repair_with_median(raw, "TotalCharges")?;

    let mut records = vec![CustomerRecord::default(); n];
    for (i, record) in records.iter_mut().enumerate() {
        record.tenure = tenure[i];
        record.monthly_charges = monthly[i];
        record.total_charges = total[i];
    }

    for field in FeatureSchema::canonical().fields() {
        if matches!(field.rule, FieldRule::Scaled { .. }) {
            continue;
        }
        let values = text_column(raw, field.name)?;
        for (i, (record, value)) in records.iter_mut().zip(values).enumerate() {
            let value = value.ok_or_else(|| {
                ChurnError::DataError(format!("missing {} at row {}", field.name, i))
            })?;
            if let Some(slot) = record.categorical_mut(field.name) {
                *slot = value.trim().to_string();
            }
        }
    }

    let labels = text_column(raw, LABEL_COLUMN)?;
    let labeled = records
        .into_iter()
        .zip(labels)
        .enumerate()
        .map(|(i, (record, label))| {
            let churned = match label.map(str::trim) {
                Some(LABEL_POSITIVE) => true,
                Some(LABEL_NEGATIVE) => false,
                other => {
                    return Err(ChurnError::DataError(format!(
                        "invalid {} label at row {}: {:?}",
                        LABEL_COLUMN, i, other
                    )))
                }
            };
            Ok(LabeledRecord { record, churned })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((labeled, repair))
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> Result<Vec<Option<&'a str>>> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::MissingField(name.to_string()))?;
    let ca = column.as_materialized_series().str().map_err(|_| {
        ChurnError::DataError(format!("{} must be read as text", name))
    })?;
    Ok(ca.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::N_FEATURES;

    fn raw_frame() -> DataFrame {
        df!(
            "customerID" => &["0001-A", "0002-B", "0003-C"],
            "gender" => &["Female", "Male", "Male"],
            "SeniorCitizen" => &["0", "1", "0"],
            "Partner" => &["Yes", "No", "No"],
            "Dependents" => &["No", "No", "Yes"],
            "tenure" => &["1", "34", "0"],
            "PhoneService" => &["No", "Yes", "Yes"],
            "MultipleLines" => &["No phone service", "No", "Yes"],
            "InternetService" => &["DSL", "Fiber optic", "No"],
            "OnlineSecurity" => &["No", "Yes", "No internet service"],
            "OnlineBackup" => &["Yes", "No", "No internet service"],
            "DeviceProtection" => &["No", "Yes", "No internet service"],
            "TechSupport" => &["No", "No", "No internet service"],
            "StreamingTV" => &["No", "Yes", "No internet service"],
            "StreamingMovies" => &["No", "No", "No internet service"],
            "Contract" => &["Month-to-month", "One year", "Two year"],
            "PaperlessBilling" => &["Yes", "No", "No"],
            "PaymentMethod" => &["Electronic check", "Mailed check", "Bank transfer (automatic)"],
            "MonthlyCharges" => &["29.85", "56.95", "19.70"],
            "TotalCharges" => &["29.85", "1889.5", " "],
            "Churn" => &["No", "Yes", "No"]
        )
        .unwrap()
    }

    #[test]
    fn test_read_records_repairs_total_charges() {
        let (records, repair) = read_records(&raw_frame()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(repair.coerced, 1);
        assert!((records[2].record.total_charges - 959.675).abs() < 1e-9);
        assert!(records[1].churned);
        assert_eq!(records[1].record.senior_citizen, "1");
    }

    #[test]
    fn test_encode_corpus_shape() {
        let (records, _) = read_records(&raw_frame()).unwrap();
        let (dataset, scaler) = encode_corpus(&records).unwrap();
        assert_eq!(dataset.features.dim(), (3, N_FEATURES));
        assert_eq!(dataset.labels.to_vec(), vec![0, 1, 0]);
        assert_eq!(scaler.bounds("tenure"), Some((0.0, 34.0)));
    }

    #[test]
    fn test_invalid_label() {
        let mut df = raw_frame();
        df.replace("Churn", Series::new("Churn".into(), &["No", "Maybe", "No"]))
            .unwrap();
        assert!(read_records(&df).is_err());
    }

    #[test]
    fn test_unknown_category_fails_batch() {
        let mut df = raw_frame();
        df.replace(
            "PaymentMethod",
            Series::new(
                "PaymentMethod".into(),
                &["Electronic check", "Crypto", "Mailed check"],
            ),
        )
        .unwrap();
        let (records, _) = read_records(&df).unwrap();
        assert!(encode_corpus(&records).is_err());
    }
}
