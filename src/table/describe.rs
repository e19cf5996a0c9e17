//! Descriptive statistics for key study variables

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::arrow_utils::{float_column, has_column};
use crate::utils::stats;

/// Variables summarized in the descriptive table, with display labels
pub const KEY_VARIABLES: &[(&str, &str)] = &[
    ("demographic_age", "Age (years)"),
    ("demographic_bmi", "BMI (kg/m²)"),
    ("climate_mean_temperature", "Mean Temperature (°C)"),
    ("climate_max_temperature", "Max Temperature (°C)"),
    ("climate_heat_index", "Heat Index"),
    ("inflammatory_crp", "C-Reactive Protein (mg/L)"),
    ("cardiovascular_systolic_bp_average", "Systolic BP (mmHg)"),
    ("metabolic_glucose", "Glucose (mmol/L)"),
];

/// One row of the descriptive statistics table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveRow {
    pub variable: String,
    pub label: String,
    pub n: u64,
    pub mean: f64,
    pub sd: f64,
    pub median: f64,
    pub iqr: f64,
    pub min: f64,
    pub max: f64,
    pub missing_pct: f64,
}

/// Summarize each key variable present in the table
///
/// Variables that are absent or entirely missing are omitted.
pub fn descriptive_statistics(table: &RecordBatch) -> Result<Vec<DescriptiveRow>> {
    let mut rows = Vec::new();
    for (variable, label) in KEY_VARIABLES {
        if !has_column(table, variable) {
            continue;
        }
        let values = float_column(table, variable)?;
        let Some((min, max)) = stats::min_max(&values) else {
            continue;
        };
        rows.push(DescriptiveRow {
            variable: (*variable).to_string(),
            label: (*label).to_string(),
            n: stats::count_present(&values) as u64,
            mean: stats::mean(&values),
            sd: stats::std_dev(&values),
            median: stats::median(&values),
            iqr: stats::quantile(&values, 0.75) - stats::quantile(&values, 0.25),
            min,
            max,
            missing_pct: stats::missing_pct(&values),
        });
    }
    Ok(rows)
}
