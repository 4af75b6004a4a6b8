//! Shared fixtures for integration tests

#![allow(dead_code)]

use churn_guard::config::ArtifactPaths;
use churn_guard::schema::CustomerRecord;
use rand::prelude::*;
use std::path::Path;

pub const RAW_HEADER: &str = "customerID,gender,SeniorCitizen,Partner,Dependents,tenure,\
PhoneService,MultipleLines,InternetService,OnlineSecurity,OnlineBackup,DeviceProtection,\
TechSupport,StreamingTV,StreamingMovies,Contract,PaperlessBilling,PaymentMethod,\
MonthlyCharges,TotalCharges,Churn";

const PAYMENT_METHODS: [&str; 4] = [
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];

fn pick<'a>(rng: &mut StdRng, options: &[&'a str]) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

/// Raw customer table in the source CSV layout.
///
/// Churn is more likely for short-tenure, month-to-month, fiber customers
/// paying by electronic check. Every 25th new customer (tenure 0) has a blank
/// `TotalCharges`, as in the source data.
pub fn raw_csv(n_rows: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::from(RAW_HEADER);
    out.push('\n');

    for i in 0..n_rows {
        let tenure: u32 = if i % 25 == 0 { 0 } else { rng.gen_range(1..=72) };
        let phone = pick(&mut rng, &["Yes", "Yes", "No"]);
        let multiple = if phone == "No" {
            "No phone service"
        } else {
            pick(&mut rng, &["No", "Yes"])
        };
        let internet = pick(&mut rng, &["DSL", "Fiber optic", "Fiber optic", "No"]);
        let mut service = || {
            if internet == "No" {
                "No internet service"
            } else {
                pick(&mut rng, &["No", "Yes"])
            }
        };
        let services: Vec<&str> = (0..6).map(|_| service()).collect();
        let contract = pick(&mut rng, &["Month-to-month", "Month-to-month", "One year", "Two year"]);
        let payment = pick(&mut rng, &PAYMENT_METHODS);

        let monthly: f64 = match internet {
            "No" => rng.gen_range(18.25..26.0),
            "DSL" => rng.gen_range(25.0..85.0),
            _ => rng.gen_range(68.0..118.75),
        };
        let total = if tenure == 0 {
            " ".to_string()
        } else {
            format!("{:.2}", monthly * tenure as f64)
        };

        let mut risk = 0.05;
        if contract == "Month-to-month" {
            risk += 0.3;
        }
        if internet == "Fiber optic" {
            risk += 0.15;
        }
        if payment == "Electronic check" {
            risk += 0.1;
        }
        if tenure < 12 {
            risk += 0.2;
        }
        let churn = if rng.gen::<f64>() < risk { "Yes" } else { "No" };

        out.push_str(&format!(
            "{:04}-TEST,{},{},{},{},{},{},{},{},{},{},{},{},{:.2},{},{}\n",
            i,
            pick(&mut rng, &["Female", "Male"]),
            pick(&mut rng, &["0", "0", "0", "1"]),
            pick(&mut rng, &["Yes", "No"]),
            pick(&mut rng, &["Yes", "No"]),
            tenure,
            phone,
            multiple,
            internet,
            services.join(","),
            contract,
            pick(&mut rng, &["Yes", "No"]),
            payment,
            monthly,
            total,
            churn,
        ));
    }
    out
}

/// Artifact layout under `dir` with a generated raw table in place
pub fn workspace(dir: &Path, n_rows: usize) -> ArtifactPaths {
    let paths = ArtifactPaths::under(dir);
    if let Some(parent) = paths.raw_data.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&paths.raw_data, raw_csv(n_rows, 42)).unwrap();
    paths
}

/// A valid record: fiber, month-to-month, electronic check, two months in
pub fn record() -> CustomerRecord {
    CustomerRecord {
        gender: "Male".into(),
        senior_citizen: "0".into(),
        partner: "No".into(),
        dependents: "No".into(),
        tenure: 2.0,
        phone_service: "Yes".into(),
        multiple_lines: "No".into(),
        internet_service: "Fiber optic".into(),
        online_security: "No".into(),
        online_backup: "No".into(),
        device_protection: "No".into(),
        tech_support: "No".into(),
        streaming_tv: "Yes".into(),
        streaming_movies: "No".into(),
        contract: "Month-to-month".into(),
        paperless_billing: "Yes".into(),
        payment_method: "Electronic check".into(),
        monthly_charges: 80.4,
        total_charges: 160.8,
    }
}

/// Brand-new customer without internet service
pub fn no_internet_record() -> CustomerRecord {
    let mut r = record();
    r.tenure = 0.0;
    r.internet_service = "No".into();
    for field in [
        &mut r.online_security,
        &mut r.online_backup,
        &mut r.device_protection,
        &mut r.tech_support,
        &mut r.streaming_tv,
        &mut r.streaming_movies,
    ] {
        *field = "No internet service".into();
    }
    r.monthly_charges = 20.0;
    r.total_charges = 20.0;
    r
}

/// JSON body for the record, keyed by raw field names
pub fn record_json(record: &CustomerRecord) -> String {
    serde_json::to_string(record).unwrap()
}
