//! Preprocessing
//!
//! - [`NumericScaler`]: min-max scaling of the three continuous fields
//! - [`RecordEncoder`]: one raw record to one [`FeatureVector`]
//! - [`TrainingPreprocessor`]: the batch step that repairs the raw table,
//!   fits the scaler on it and writes the encoded dataset

mod dataset;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use dataset::EncodedDataset;
pub use encoder::{encode, FeatureVector, RecordEncoder};
pub use imputer::{parse_strict, repair_with_median, RepairReport};
pub use pipeline::{encode_corpus, read_records, PreprocessReport, TrainingPreprocessor};
pub use scaler::NumericScaler;
