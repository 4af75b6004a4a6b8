//! Raw customer records
//!
//! Field names follow the raw CSV header so the same struct deserializes
//! from an API request body and is built row by row during preprocessing.

use serde::{Deserialize, Deserializer, Serialize};

/// One raw customer, before encoding.
///
/// Categorical values are kept as the raw strings; the encoder checks them
/// against the declared domains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub gender: String,
    #[serde(rename = "SeniorCitizen", deserialize_with = "deserialize_flag")]
    pub senior_citizen: String,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "Dependents")]
    pub dependents: String,
    pub tenure: f64,
    #[serde(rename = "PhoneService")]
    pub phone_service: String,
    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,
    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,
    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,
    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,
}

impl CustomerRecord {
    /// Raw string value of a binary or categorical field, by raw field name
    pub fn categorical(&self, field: &str) -> Option<&str> {
        self.slot(field).map(String::as_str)
    }

    /// Mutable access to a binary or categorical field, by raw field name
    pub fn categorical_mut(&mut self, field: &str) -> Option<&mut String> {
        let slot = match field {
            "gender" => &mut self.gender,
            "SeniorCitizen" => &mut self.senior_citizen,
            "Partner" => &mut self.partner,
            "Dependents" => &mut self.dependents,
            "PhoneService" => &mut self.phone_service,
            "MultipleLines" => &mut self.multiple_lines,
            "InternetService" => &mut self.internet_service,
            "OnlineSecurity" => &mut self.online_security,
            "OnlineBackup" => &mut self.online_backup,
            "DeviceProtection" => &mut self.device_protection,
            "TechSupport" => &mut self.tech_support,
            "StreamingTV" => &mut self.streaming_tv,
            "StreamingMovies" => &mut self.streaming_movies,
            "Contract" => &mut self.contract,
            "PaperlessBilling" => &mut self.paperless_billing,
            "PaymentMethod" => &mut self.payment_method,
            _ => return None,
        };
        Some(slot)
    }

    fn slot(&self, field: &str) -> Option<&String> {
        let slot = match field {
            "gender" => &self.gender,
            "SeniorCitizen" => &self.senior_citizen,
            "Partner" => &self.partner,
            "Dependents" => &self.dependents,
            "PhoneService" => &self.phone_service,
            "MultipleLines" => &self.multiple_lines,
            "InternetService" => &self.internet_service,
            "OnlineSecurity" => &self.online_security,
            "OnlineBackup" => &self.online_backup,
            "DeviceProtection" => &self.device_protection,
            "TechSupport" => &self.tech_support,
            "StreamingTV" => &self.streaming_tv,
            "StreamingMovies" => &self.streaming_movies,
            "Contract" => &self.contract,
            "PaperlessBilling" => &self.paperless_billing,
            "PaymentMethod" => &self.payment_method,
            _ => return None,
        };
        Some(slot)
    }

    /// `[tenure, MonthlyCharges, TotalCharges]`, in scaler slot order
    pub fn numeric(&self) -> [f64; 3] {
        [self.tenure, self.monthly_charges, self.total_charges]
    }
}

/// A training row: the record plus its churn label
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub record: CustomerRecord,
    pub churned: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Accept `true`/`false`, `0`/`1` or `"0"`/`"1"` for the senior-citizen flag.
///
/// Other integers and strings pass through unchanged and are rejected by the
/// encoder with the offending value.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match FlagRepr::deserialize(deserializer)? {
        FlagRepr::Bool(b) => if b { "1" } else { "0" }.to_string(),
        FlagRepr::Int(i) => i.to_string(),
        FlagRepr::Text(s) => s,
    })
}
