//! Feature schema
//!
//! The single declaration of the encoded feature layout. Every component that
//! produces or consumes a feature vector (batch preprocessing, the training
//! engine, the inference engine, the explainability step and the HTTP API)
//! reads its column names, order and per-field rules from here.
//!
//! Layout:
//! - 6 binary columns (`gender`, `SeniorCitizen`, `Partner`, `Dependents`,
//!   `PhoneService`, `PaperlessBilling`)
//! - 3 min-max scaled columns (`tenure`, `MonthlyCharges`, `TotalCharges`)
//! - 21 one-hot indicator columns from 10 categorical fields, each with one
//!   declared reference category that is encoded as all zeros

mod record;

pub use record::{CustomerRecord, LabeledRecord};

use crate::error::{ChurnError, Result};
use serde::Serialize;
use std::sync::LazyLock;

/// Number of columns in an encoded feature vector
pub const N_FEATURES: usize = 30;

/// Number of min-max scaled columns
pub const N_NUMERIC: usize = 3;

/// Raw identifier column, never encoded or persisted
pub const ID_COLUMN: &str = "customerID";

/// Raw and processed label column
pub const LABEL_COLUMN: &str = "Churn";

/// Raw label value for the positive (churned) class
pub const LABEL_POSITIVE: &str = "Yes";

/// Raw label value for the negative class
pub const LABEL_NEGATIVE: &str = "No";

/// Scaled fields, in scaler slot order
pub const NUMERIC_FIELDS: [&str; N_NUMERIC] = ["tenure", "MonthlyCharges", "TotalCharges"];

/// Encoding rule for one raw field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FieldRule {
    /// One column: 1 when the raw value equals `positive`, 0 when it equals
    /// `negative`. Anything else is rejected.
    Binary {
        positive: &'static str,
        negative: &'static str,
    },
    /// One column scaled through slot `slot` of the fitted numeric scaler.
    Scaled { slot: usize },
    /// One indicator column per entry of `levels`, named `<field>_<level>`.
    /// `reference` is accepted and leaves every indicator at 0.
    OneHot {
        reference: &'static str,
        levels: &'static [&'static str],
    },
}

/// A raw field and its encoding rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    #[serde(flatten)]
    pub rule: FieldRule,
}

impl FieldSpec {
    const fn binary(name: &'static str, positive: &'static str, negative: &'static str) -> Self {
        Self { name, rule: FieldRule::Binary { positive, negative } }
    }

    const fn scaled(name: &'static str, slot: usize) -> Self {
        Self { name, rule: FieldRule::Scaled { slot } }
    }

    const fn one_hot(
        name: &'static str,
        reference: &'static str,
        levels: &'static [&'static str],
    ) -> Self {
        Self { name, rule: FieldRule::OneHot { reference, levels } }
    }

    /// Number of encoded columns this field occupies
    pub fn width(&self) -> usize {
        match self.rule {
            FieldRule::Binary { .. } | FieldRule::Scaled { .. } => 1,
            FieldRule::OneHot { levels, .. } => levels.len(),
        }
    }

    /// Every raw value the field accepts
    pub fn domain(&self) -> Vec<&'static str> {
        match self.rule {
            FieldRule::Binary { positive, negative } => vec![negative, positive],
            FieldRule::Scaled { .. } => Vec::new(),
            FieldRule::OneHot { reference, levels } => {
                std::iter::once(reference).chain(levels.iter().copied()).collect()
            }
        }
    }

    /// The category encoded as all-zero indicators, for one-hot fields
    pub fn reference(&self) -> Option<&'static str> {
        match self.rule {
            FieldRule::OneHot { reference, .. } => Some(reference),
            _ => None,
        }
    }

    /// Encoded column names, in layout order
    pub fn columns(&self) -> Vec<String> {
        match self.rule {
            FieldRule::Binary { .. } | FieldRule::Scaled { .. } => vec![self.name.to_string()],
            FieldRule::OneHot { levels, .. } => levels
                .iter()
                .map(|level| format!("{}_{}", self.name, level))
                .collect(),
        }
    }
}

const YES_NO_SERVICE: &[&str] = &["No internet service", "Yes"];

/// Raw fields in encoded-layout order
static FIELDS: [FieldSpec; 19] = [
    FieldSpec::binary("gender", "Female", "Male"),
    FieldSpec::binary("SeniorCitizen", "1", "0"),
    FieldSpec::binary("Partner", "Yes", "No"),
    FieldSpec::binary("Dependents", "Yes", "No"),
    FieldSpec::scaled("tenure", 0),
    FieldSpec::binary("PhoneService", "Yes", "No"),
    FieldSpec::binary("PaperlessBilling", "Yes", "No"),
    FieldSpec::scaled("MonthlyCharges", 1),
    FieldSpec::scaled("TotalCharges", 2),
    FieldSpec::one_hot("MultipleLines", "No", &["No phone service", "Yes"]),
    FieldSpec::one_hot("InternetService", "DSL", &["Fiber optic", "No"]),
    FieldSpec::one_hot("OnlineSecurity", "No", YES_NO_SERVICE),
    FieldSpec::one_hot("OnlineBackup", "No", YES_NO_SERVICE),
    FieldSpec::one_hot("DeviceProtection", "No", YES_NO_SERVICE),
    FieldSpec::one_hot("TechSupport", "No", YES_NO_SERVICE),
    FieldSpec::one_hot("StreamingTV", "No", YES_NO_SERVICE),
    FieldSpec::one_hot("StreamingMovies", "No", YES_NO_SERVICE),
    FieldSpec::one_hot("Contract", "Month-to-month", &["One year", "Two year"]),
    FieldSpec::one_hot(
        "PaymentMethod",
        "Bank transfer (automatic)",
        &["Credit card (automatic)", "Electronic check", "Mailed check"],
    ),
];

static SCHEMA: LazyLock<FeatureSchema> = LazyLock::new(|| {
    let mut columns = Vec::with_capacity(N_FEATURES);
    let mut offsets = Vec::with_capacity(FIELDS.len());
    for field in FIELDS.iter() {
        offsets.push(columns.len());
        columns.extend(field.columns());
    }
    FeatureSchema { fields: &FIELDS, columns, offsets }
});

/// The canonical feature layout
#[derive(Debug)]
pub struct FeatureSchema {
    fields: &'static [FieldSpec],
    columns: Vec<String>,
    /// Index of each field's first column
    offsets: Vec<usize>,
}

impl FeatureSchema {
    /// The one schema used by every encoder and consumer
    pub fn canonical() -> &'static FeatureSchema {
        &SCHEMA
    }

    /// Ordered encoded column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw fields in layout order
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Look up a raw field by name
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Column range occupied by a raw field
    pub fn field_range(&self, name: &str) -> Option<std::ops::Range<usize>> {
        let idx = self.fields.iter().position(|f| f.name == name)?;
        let start = self.offsets[idx];
        Some(start..start + self.fields[idx].width())
    }

    /// Position of an encoded column
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `(field, reference category)` for every one-hot field
    pub fn reference_categories(&self) -> Vec<(&'static str, &'static str)> {
        self.fields
            .iter()
            .filter_map(|f| f.reference().map(|r| (f.name, r)))
            .collect()
    }

    /// Check that `actual` is exactly the canonical column list
    pub fn validate_columns<S: AsRef<str>>(&self, actual: &[S]) -> Result<()> {
        let matches = actual.len() == self.columns.len()
            && actual
                .iter()
                .zip(self.columns.iter())
                .all(|(a, e)| a.as_ref() == e);
        if matches {
            return Ok(());
        }

        let first_diff = actual
            .iter()
            .map(|a| a.as_ref())
            .zip(self.columns.iter())
            .position(|(a, e)| a != e)
            .unwrap_or(actual.len().min(self.columns.len()));
        Err(ChurnError::SchemaMismatch {
            expected: format!(
                "{} canonical columns (column {}: {:?})",
                self.columns.len(),
                first_diff,
                self.columns.get(first_diff)
            ),
            actual: format!(
                "{} columns (column {}: {:?})",
                actual.len(),
                first_diff,
                actual.get(first_diff).map(|a| a.as_ref())
            ),
        })
    }
}

/// Ordered list of the 30 encoded column names
pub fn canonical_columns() -> &'static [String] {
    FeatureSchema::canonical().columns()
}
