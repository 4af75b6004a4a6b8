//! Integration test: Preprocessing step end-to-end

mod common;

use churn_guard::error::{ChurnError, PipelineStep};
use churn_guard::export::ArtifactStore;
use churn_guard::preprocessing::{EncodedDataset, NumericScaler, TrainingPreprocessor};
use churn_guard::schema::{canonical_columns, LABEL_COLUMN, N_FEATURES};
use churn_guard::utils::DataLoader;
use tempfile::tempdir;

#[test]
fn test_preprocess_writes_dataset_and_scaler() {
    let dir = tempdir().unwrap();
    let paths = common::workspace(dir.path(), 240);

    let report = TrainingPreprocessor::new(paths.clone()).run().unwrap();
    assert_eq!(report.rows, 240);
    assert!(report.churned > 0 && report.churned < 240);
    // Rows 0, 25, ..., 225 have a blank TotalCharges
    assert_eq!(report.total_charges.coerced, 10);
    assert!(report.total_charges.fill_value > 0.0);

    assert!(paths.processed_data.is_file());
    assert!(paths.scaler.is_file());

    let dataset = EncodedDataset::read_csv(&paths.processed_data).unwrap();
    assert_eq!(dataset.n_rows(), 240);
    assert_eq!(dataset.features.ncols(), N_FEATURES);
    assert_eq!(dataset.class_counts().1, report.churned);
    assert!(dataset.features.iter().all(|&x| (0.0..=1.0).contains(&x)));
}

#[test]
fn test_processed_header_is_canonical_plus_label() {
    let dir = tempdir().unwrap();
    let paths = common::workspace(dir.path(), 60);
    TrainingPreprocessor::new(paths.clone()).run().unwrap();

    let df = DataLoader::new().load_csv(&paths.processed_data).unwrap();
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    assert_eq!(names.len(), N_FEATURES + 1);
    assert_eq!(&names[..N_FEATURES], canonical_columns());
    assert_eq!(names[N_FEATURES], LABEL_COLUMN);
    assert!(!names.iter().any(|n| n == "customerID"));
}

#[test]
fn test_scaler_maps_corpus_extremes_to_unit_interval() {
    let dir = tempdir().unwrap();
    let paths = common::workspace(dir.path(), 120);
    TrainingPreprocessor::new(paths.clone()).run().unwrap();

    let scaler: NumericScaler = ArtifactStore::load(&paths.scaler).unwrap();
    let (t_min, t_max) = scaler.bounds("tenure").unwrap();
    let (m_min, m_max) = scaler.bounds("MonthlyCharges").unwrap();
    let (c_min, c_max) = scaler.bounds("TotalCharges").unwrap();
    assert_eq!(t_min, 0.0);

    assert_eq!(scaler.transform([t_min, m_min, c_min]), [0.0, 0.0, 0.0]);
    assert_eq!(scaler.transform([t_max, m_max, c_max]), [1.0, 1.0, 1.0]);
}

#[test]
fn test_missing_raw_table_names_source() {
    let dir = tempdir().unwrap();
    let paths = churn_guard::config::ArtifactPaths::under(dir.path());
    let err = TrainingPreprocessor::new(paths.clone()).run().unwrap_err();
    match err {
        ChurnError::MissingArtifact { path, producer } => {
            assert_eq!(path, paths.raw_data);
            assert_eq!(producer, PipelineStep::SourceData);
        }
        other => panic!("expected MissingArtifact, got {other}"),
    }
    assert!(!paths.processed_data.exists());
}

#[test]
fn test_unknown_category_in_raw_table_fails_with_row() {
    let dir = tempdir().unwrap();
    let paths = common::workspace(dir.path(), 30);
    let csv = std::fs::read_to_string(&paths.raw_data).unwrap();
    let corrupted = csv.replacen("Month-to-month", "Weekly", 1);
    std::fs::write(&paths.raw_data, corrupted).unwrap();

    let err = TrainingPreprocessor::new(paths.clone()).run().unwrap_err();
    assert!(matches!(err, ChurnError::DataError(_)), "got {err}");
    assert!(err.to_string().contains("row"));
    assert!(!paths.scaler.exists());
}

#[test]
fn test_invalid_label_rejected() {
    let dir = tempdir().unwrap();
    let paths = common::workspace(dir.path(), 30);
    let csv = std::fs::read_to_string(&paths.raw_data).unwrap();
    let mut lines: Vec<String> = csv.lines().map(str::to_string).collect();
    let last = lines.len() - 1;
    let row = lines[last].rsplit_once(',').map(|(head, _)| format!("{head},Maybe")).unwrap();
    lines[last] = row;
    std::fs::write(&paths.raw_data, lines.join("\n") + "\n").unwrap();

    let err = TrainingPreprocessor::new(paths).run().unwrap_err();
    assert!(err.to_string().contains(LABEL_COLUMN));
}
