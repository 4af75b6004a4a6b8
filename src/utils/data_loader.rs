//! Data loading utilities

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// CSV loader for the raw and processed tables
pub struct DataLoader {
    /// Rows scanned for type inference; `Some(0)` reads every column as text
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a loader that infers types from the whole file
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
        }
    }

    /// Create a loader that keeps every column as text.
    ///
    /// Used for the raw table, where numeric columns may hold blanks and the
    /// categorical flags must keep their literal spelling.
    pub fn text() -> Self {
        Self {
            infer_schema_length: Some(0),
        }
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let start = Instant::now();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()
            .map_err(|e| ChurnError::DataError(format!("{}: {}", path.display(), e)))?;

        debug!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );
        Ok(df)
    }
}

/// Data saver
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV, creating parent directories
    pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| ChurnError::DataError(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data.csv");

        let mut df = df!(
            "a" => &[1.0, 2.0, 3.0],
            "b" => &["x", "y", "z"]
        )
        .unwrap();
        DataSaver::save_csv(&mut df, &path).unwrap();

        let loaded = DataLoader::new().load_csv(&path).unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 2);
        assert_eq!(loaded.column("a").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_text_loader_keeps_strings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(&path, "SeniorCitizen,TotalCharges\n0,29.85\n1, \n").unwrap();

        let loaded = DataLoader::text().load_csv(&path).unwrap();
        assert_eq!(loaded.column("SeniorCitizen").unwrap().dtype(), &DataType::String);
        assert_eq!(loaded.column("TotalCharges").unwrap().dtype(), &DataType::String);
    }
}
