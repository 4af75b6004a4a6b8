//! Integration test: one encoder for training and inference

mod common;

use churn_guard::error::ChurnError;
use churn_guard::preprocessing::{encode, encode_corpus, read_records, NumericScaler};
use churn_guard::schema::{canonical_columns, CustomerRecord, FeatureSchema, FieldRule, N_FEATURES};
use churn_guard::utils::DataLoader;
use tempfile::tempdir;

fn scaler() -> NumericScaler {
    NumericScaler::fit(&[[0.0, 18.25, 18.8], [72.0, 118.75, 8684.8]]).unwrap()
}

const SERVICES: [&str; 6] = [
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
];

#[test]
fn test_no_internet_new_customer() {
    let v = encode(&common::no_internet_record(), &scaler()).unwrap();

    assert_eq!(v.get("tenure"), Some(0.0));
    assert_eq!(v.get("InternetService_No"), Some(1.0));
    assert_eq!(v.get("InternetService_Fiber optic"), Some(0.0));
    for service in SERVICES {
        assert_eq!(v.get(&format!("{}_No internet service", service)), Some(1.0), "{}", service);
        assert_eq!(v.get(&format!("{}_Yes", service)), Some(0.0), "{}", service);
    }
    // Month-to-month is the reference level
    assert_eq!(v.get("Contract_One year"), Some(0.0));
    assert_eq!(v.get("Contract_Two year"), Some(0.0));
}

#[test]
fn test_payment_method_indicators() {
    let mut record = common::record();
    record.payment_method = "Electronic check".into();
    let v = encode(&record, &scaler()).unwrap();
    assert_eq!(v.get("PaymentMethod_Electronic check"), Some(1.0));
    assert_eq!(v.get("PaymentMethod_Credit card (automatic)"), Some(0.0));
    assert_eq!(v.get("PaymentMethod_Mailed check"), Some(0.0));

    // Mailed check has its own column; bank transfer is the reference
    record.payment_method = "Mailed check".into();
    let v = encode(&record, &scaler()).unwrap();
    assert_eq!(v.get("PaymentMethod_Mailed check"), Some(1.0));
    assert_eq!(v.get("PaymentMethod_Electronic check"), Some(0.0));

    record.payment_method = "Bank transfer (automatic)".into();
    let v = encode(&record, &scaler()).unwrap();
    let range = FeatureSchema::canonical().field_range("PaymentMethod").unwrap();
    assert!(v.as_slice()[range].iter().all(|&x| x == 0.0));
}

#[test]
fn test_reference_levels_encode_to_zeros() {
    let schema = FeatureSchema::canonical();
    let scaler = scaler();

    for field in schema.fields() {
        let FieldRule::OneHot { reference, .. } = field.rule else {
            continue;
        };
        let range = schema.field_range(field.name).unwrap();
        for value in field.domain() {
            let mut record = common::record();
            *record.categorical_mut(field.name).unwrap() = value.to_string();
            let v = encode(&record, &scaler).unwrap();
            let ones = v.as_slice()[range.clone()].iter().filter(|&&x| x == 1.0).count();
            let zeros = v.as_slice()[range.clone()].iter().filter(|&&x| x == 0.0).count();
            assert_eq!(ones + zeros, range.len(), "{}={}", field.name, value);
            if value == reference {
                assert_eq!(ones, 0, "{}={}", field.name, value);
            } else {
                assert_eq!(ones, 1, "{}={}", field.name, value);
            }
        }
    }
}

#[test]
fn test_out_of_domain_value_rejected() {
    let mut record = common::record();
    record.payment_method = "Cryptocurrency".into();
    let err = encode(&record, &scaler()).unwrap_err();
    match err {
        ChurnError::UnknownCategory { field, value } => {
            assert_eq!(field, "PaymentMethod");
            assert_eq!(value, "Cryptocurrency");
        }
        other => panic!("expected UnknownCategory, got {other}"),
    }

    let mut record = common::record();
    record.gender = "Unknown".into();
    assert!(encode(&record, &scaler()).unwrap_err().is_rejected_input());

    // The senior flag is 0/1 only
    for raw in ["Yes", "No", "2"] {
        let mut record = common::record();
        record.senior_citizen = raw.into();
        match encode(&record, &scaler()).unwrap_err() {
            ChurnError::UnknownCategory { field, value } => {
                assert_eq!(field, "SeniorCitizen");
                assert_eq!(value, raw);
            }
            other => panic!("expected UnknownCategory, got {other}"),
        }
    }
}

#[test]
fn test_encoding_is_deterministic_and_fixed_width() {
    let scaler = scaler();
    for record in [common::record(), common::no_internet_record()] {
        let a = encode(&record, &scaler).unwrap();
        let b = encode(&record, &scaler).unwrap();
        assert_eq!(a.to_le_bytes(), b.to_le_bytes());
        assert_eq!(a.len(), N_FEATURES);
        assert_eq!(a.len(), canonical_columns().len());
        let names: Vec<&str> = a.named().map(|(name, _)| name).collect();
        assert_eq!(names, canonical_columns().iter().map(String::as_str).collect::<Vec<_>>());
    }
}

/// Raw CSV row to the JSON an API client would send
fn row_to_record(header: &[&str], row: &str) -> serde_json::Result<CustomerRecord> {
    let mut object = serde_json::Map::new();
    for (name, value) in header.iter().zip(row.split(',')) {
        let json = match *name {
            "customerID" | "Churn" => continue,
            "tenure" | "MonthlyCharges" | "TotalCharges" => {
                serde_json::json!(value.trim().parse::<f64>().unwrap())
            }
            _ => serde_json::json!(value),
        };
        object.insert(name.to_string(), json);
    }
    serde_json::from_value(serde_json::Value::Object(object))
}

#[test]
fn test_training_and_inference_paths_are_byte_identical() {
    let dir = tempdir().unwrap();
    let csv = common::raw_csv(120, 9);
    let path = dir.path().join("raw.csv");
    std::fs::write(&path, &csv).unwrap();

    // Training path: text table → records → fitted scaler → encoded matrix
    let raw = DataLoader::text().load_csv(&path).unwrap();
    let (records, _) = read_records(&raw).unwrap();
    let (dataset, scaler) = encode_corpus(&records).unwrap();

    // Inference path: one JSON record at a time
    let mut lines = csv.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    let mut compared = 0;
    for (i, row) in lines.enumerate() {
        if row.split(',').nth(19).map(str::trim) == Some("") {
            continue; // imputed at training time, not representable raw
        }
        let record = row_to_record(&header, row).unwrap();
        let online = encode(&record, &scaler).unwrap();
        let batch: Vec<u8> = dataset
            .features
            .row(i)
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .collect();
        assert_eq!(online.to_le_bytes(), batch, "row {}", i);
        compared += 1;
    }
    assert!(compared > 100);
}
