//! Numeric column repair
//!
//! Raw columns are read as text. Numeric fields are parsed here; for the
//! repaired field, unparseable cells become missing and are filled with the
//! median of the parsed values over the whole frame.

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of repairing one numeric column
#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub column: String,
    /// Cells that failed to parse (or were empty) and were filled
    pub coerced: usize,
    /// Median of the parsed values, used as the fill value
    pub fill_value: f64,
}

/// Parse `column` as `f64`, filling unparseable cells with the column median.
///
/// The median is computed over every row of `df`, before any train/test split.
pub fn repair_with_median(df: &DataFrame, column: &str) -> Result<(Vec<f64>, RepairReport)> {
    let ca = coerce_f64(df, column)?;
    let coerced = ca.null_count();

    let fill_value = ca.median().ok_or_else(|| {
        ChurnError::DataError(format!("{} has no parseable values", column))
    })?;

    let values: Vec<f64> = ca
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();

    if coerced > 0 {
        info!(column, coerced, fill_value, "Imputed unparseable values with median");
    } else {
        debug!(column, "No values needed imputation");
    }

    Ok((
        values,
        RepairReport {
            column: column.to_string(),
            coerced,
            fill_value,
        },
    ))
}

/// Parse `column` as `f64`; any unparseable or missing cell is an error
pub fn parse_strict(df: &DataFrame, column: &str) -> Result<Vec<f64>> {
    let ca = coerce_f64(df, column)?;
    ca.into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                ChurnError::DataError(format!("{} is not numeric at row {}", column, row))
            })
        })
        .collect()
}

/// Non-strict cast to `Float64`: parse failures become null
fn coerce_f64(df: &DataFrame, column: &str) -> Result<Float64Chunked> {
    let series = df
        .column(column)
        .map_err(|_| ChurnError::MissingField(column.to_string()))?
        .as_materialized_series()
        .clone();

    let series = match series.dtype() {
        DataType::String => {
            // " 12.5" parses after trimming; " " stays empty and becomes null
            let trimmed: StringChunked = series
                .str()?
                .into_iter()
                .map(|v| v.map(str::trim))
                .collect();
            trimmed.into_series().with_name(series.name().clone())
        }
        _ => series,
    };

    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.clone())
}
