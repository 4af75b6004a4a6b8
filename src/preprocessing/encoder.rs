//! Record encoding
//!
//! [`RecordEncoder`] is the only code that turns a [`CustomerRecord`] into
//! numbers. Batch preprocessing and single-record inference both call
//! [`RecordEncoder::encode`]; the batch entry point is a loop over it.

use super::scaler::NumericScaler;
use crate::error::{ChurnError, Result};
use crate::schema::{CustomerRecord, FeatureSchema, FieldRule, N_FEATURES, N_NUMERIC};
use ndarray::Array2;
use serde::Serialize;

/// One encoded customer: 30 values in canonical column order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    values: [f64; N_FEATURES],
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value of a named column
    pub fn get(&self, column: &str) -> Option<f64> {
        FeatureSchema::canonical()
            .column_index(column)
            .map(|idx| self.values[idx])
    }

    /// `(column, value)` pairs in canonical order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FeatureSchema::canonical()
            .columns()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Little-endian bytes of every value, for exact comparisons
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

/// Encodes raw records against the canonical schema with a fitted scaler
#[derive(Debug, Clone, Copy)]
pub struct RecordEncoder<'a> {
    scaler: &'a NumericScaler,
    schema: &'static FeatureSchema,
}

impl<'a> RecordEncoder<'a> {
    pub fn new(scaler: &'a NumericScaler) -> Self {
        Self {
            scaler,
            schema: FeatureSchema::canonical(),
        }
    }

    /// Encode one record.
    ///
    /// Fails with [`ChurnError::UnknownCategory`] when a binary or categorical
    /// value is outside its declared domain, and with
    /// [`ChurnError::InvalidInput`] for non-finite numeric values.
    pub fn encode(&self, record: &CustomerRecord) -> Result<FeatureVector> {
        let mut values = [0.0; N_FEATURES];

        let raw_numeric = record.numeric();
        for (slot, x) in raw_numeric.iter().enumerate() {
            if !x.is_finite() {
                return Err(ChurnError::InvalidInput(format!(
                    "{} must be a finite number, got {}",
                    crate::schema::NUMERIC_FIELDS[slot],
                    x
                )));
            }
        }
        let scaled: [f64; N_NUMERIC] = self.scaler.transform(raw_numeric);

        let mut col = 0;
        for field in self.schema.fields() {
            match field.rule {
                FieldRule::Binary { positive, negative } => {
                    let value = raw_value(record, field.name)?;
                    values[col] = if value == positive {
                        1.0
                    } else if value == negative {
                        0.0
                    } else {
                        return Err(unknown(field.name, value));
                    };
                }
                FieldRule::Scaled { slot } => {
                    values[col] = scaled[slot];
                }
                FieldRule::OneHot { reference, levels } => {
                    let value = raw_value(record, field.name)?;
                    if value != reference {
                        let level = levels
                            .iter()
                            .position(|l| *l == value)
                            .ok_or_else(|| unknown(field.name, value))?;
                        values[col + level] = 1.0;
                    }
                }
            }
            col += field.width();
        }

        if col != N_FEATURES {
            return Err(ChurnError::ShapeError {
                expected: format!("{} columns", N_FEATURES),
                actual: format!("{} columns", col),
            });
        }
        Ok(FeatureVector { values })
    }

    /// Encode records into an `(n, 30)` matrix, one [`encode`](Self::encode)
    /// call per row. The first rejected row aborts the batch.
    pub fn encode_all(&self, records: &[CustomerRecord]) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((records.len(), N_FEATURES));
        for (i, record) in records.iter().enumerate() {
            let vector = self.encode(record).map_err(|e| match e {
                ChurnError::UnknownCategory { field, value } => ChurnError::DataError(format!(
                    "row {}: unknown category for {}: {:?}",
                    i, field, value
                )),
                other => other,
            })?;
            matrix
                .row_mut(i)
                .assign(&ndarray::ArrayView1::from(vector.as_slice()));
        }
        Ok(matrix)
    }
}

/// Encode a single record with a fitted scaler
pub fn encode(record: &CustomerRecord, scaler: &NumericScaler) -> Result<FeatureVector> {
    RecordEncoder::new(scaler).encode(record)
}

fn raw_value<'r>(record: &'r CustomerRecord, field: &str) -> Result<&'r str> {
    record
        .categorical(field)
        .ok_or_else(|| ChurnError::MissingField(field.to_string()))
}

fn unknown(field: &str, value: &str) -> ChurnError {
    ChurnError::UnknownCategory {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaler() -> NumericScaler {
        NumericScaler::fit(&[[0.0, 18.25, 18.8], [72.0, 118.75, 8684.8]]).unwrap()
    }

    fn record() -> CustomerRecord {
        CustomerRecord {
            gender: "Female".into(),
            senior_citizen: "0".into(),
            partner: "Yes".into(),
            dependents: "No".into(),
            tenure: 1.0,
            phone_service: "No".into(),
            multiple_lines: "No phone service".into(),
            internet_service: "DSL".into(),
            online_security: "No".into(),
            online_backup: "Yes".into(),
            device_protection: "No".into(),
            tech_support: "No".into(),
            streaming_tv: "No".into(),
            streaming_movies: "No".into(),
            contract: "Month-to-month".into(),
            paperless_billing: "Yes".into(),
            payment_method: "Electronic check".into(),
            monthly_charges: 29.85,
            total_charges: 29.85,
        }
    }

    #[test]
    fn test_binary_and_reference_fields() {
        let v = encode(&record(), &scaler()).unwrap();
        assert_eq!(v.get("gender"), Some(1.0));
        assert_eq!(v.get("Partner"), Some(1.0));
        assert_eq!(v.get("PhoneService"), Some(0.0));
        assert_eq!(v.get("MultipleLines_No phone service"), Some(1.0));
        assert_eq!(v.get("InternetService_Fiber optic"), Some(0.0));
        assert_eq!(v.get("InternetService_No"), Some(0.0));
        assert_eq!(v.get("OnlineBackup_Yes"), Some(1.0));
        assert_eq!(v.get("Contract_One year"), Some(0.0));
        assert_eq!(v.get("Contract_Two year"), Some(0.0));
    }

    #[test]
    fn test_scaled_values() {
        let v = encode(&record(), &scaler()).unwrap();
        let tenure = v.get("tenure").unwrap();
        assert!((tenure - 1.0 / 72.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_binary_value_rejected() {
        let mut r = record();
        r.partner = "Maybe".into();
        let err = encode(&r, &scaler()).unwrap_err();
        assert!(matches!(err, ChurnError::UnknownCategory { ref field, .. } if field == "Partner"));
    }

    #[test]
    fn test_non_finite_numeric_rejected() {
        let mut r = record();
        r.total_charges = f64::NAN;
        assert!(matches!(
            encode(&r, &scaler()),
            Err(ChurnError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_encode_all_matches_single() {
        let s = scaler();
        let encoder = RecordEncoder::new(&s);
        let mut other = record();
        other.contract = "Two year".into();
        let matrix = encoder.encode_all(&[record(), other.clone()]).unwrap();
        assert_eq!(matrix.dim(), (2, N_FEATURES));
        assert_eq!(
            matrix.row(1).to_vec(),
            encoder.encode(&other).unwrap().as_slice().to_vec()
        );
    }

    #[test]
    fn test_encode_all_reports_row() {
        let s = scaler();
        let mut bad = record();
        bad.contract = "Three year".into();
        let err = RecordEncoder::new(&s)
            .encode_all(&[record(), bad])
            .unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
