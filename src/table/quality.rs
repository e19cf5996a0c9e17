//! Data-quality assessment of a loaded feature table

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::config::ConfigRegistry;
use crate::error::Result;
use crate::table::CLIMATE_PREFIX;
use crate::utils::arrow_utils::array_to_f64;
use crate::utils::stats;

/// Columns above this missing percentage are listed as high-missing
pub const HIGH_MISSING_PCT: f64 = 50.0;

/// Biomarker columns examined for IQR outliers
pub const OUTLIER_COLUMN_LIMIT: usize = 10;

/// Completeness of one pathway's biomarker columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayCompleteness {
    pub variables_found: usize,
    /// Percentage of rows where every pathway column is present
    pub completeness_pct: f64,
}

/// Summary of missingness, outliers and climate coverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub n_rows: usize,
    pub n_columns: usize,
    pub pathway_completeness: BTreeMap<String, PathwayCompleteness>,
    /// Mean of the per-column missing percentages
    pub overall_missing_pct: f64,
    pub high_missing_columns: Vec<String>,
    pub outliers_detected: usize,
    pub outlier_rate_pct: f64,
    /// Percentage of rows with every climate column present
    pub climate_completeness_pct: f64,
}

struct NumericColumn {
    name: String,
    values: Vec<f64>,
}

fn rows_complete_pct(columns: &[&NumericColumn], n_rows: usize) -> f64 {
    if columns.is_empty() || n_rows == 0 {
        return 0.0;
    }
    let complete = (0..n_rows)
        .filter(|&row| columns.iter().all(|c| !c.values[row].is_nan()))
        .count();
    complete as f64 / n_rows as f64 * 100.0
}

fn iqr_outliers(values: &[f64]) -> usize {
    let q1 = stats::quantile(values, 0.25);
    let q3 = stats::quantile(values, 0.75);
    if q1.is_nan() || q3.is_nan() {
        return 0;
    }
    let iqr = q3 - q1;
    let (lo, hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    values.iter().filter(|v| **v < lo || **v > hi).count()
}

/// Assess the quality of a feature table
///
/// Only numeric columns are examined. Pathway completeness uses the
/// registry's pathway prefixes; outliers are counted with the 1.5×IQR rule
/// over the first [`OUTLIER_COLUMN_LIMIT`] biomarker columns.
pub fn assess_quality(table: &RecordBatch, registry: &ConfigRegistry) -> Result<DataQualityReport> {
    let n_rows = table.num_rows();
    let schema = table.schema();

    let mut columns = Vec::new();
    for (field, array) in schema.fields().iter().zip(table.columns()) {
        if field.data_type().is_numeric() {
            columns.push(NumericColumn {
                name: field.name().clone(),
                values: array_to_f64(array)?,
            });
        }
    }

    let pathway_completeness = registry
        .pathways
        .iter()
        .map(|pathway| {
            let prefix = format!("{}_", pathway.name);
            let members: Vec<&NumericColumn> =
                columns.iter().filter(|c| c.name.starts_with(&prefix)).collect();
            let entry = PathwayCompleteness {
                variables_found: members.len(),
                completeness_pct: rows_complete_pct(&members, n_rows),
            };
            (pathway.name.clone(), entry)
        })
        .collect();

    let missing: Vec<(String, f64)> = columns
        .iter()
        .map(|c| (c.name.clone(), stats::missing_pct(&c.values)))
        .collect();
    let overall_missing_pct = if missing.is_empty() {
        0.0
    } else {
        missing.iter().map(|(_, pct)| pct).sum::<f64>() / missing.len() as f64
    };
    let high_missing_columns = missing
        .iter()
        .filter(|(_, pct)| *pct > HIGH_MISSING_PCT)
        .map(|(name, _)| name.clone())
        .collect();

    let health_prefixes = registry.health_prefixes();
    let outliers_detected: usize = columns
        .iter()
        .filter(|c| health_prefixes.iter().any(|p| c.name.starts_with(p.as_str())))
        .take(OUTLIER_COLUMN_LIMIT)
        .map(|c| iqr_outliers(&c.values))
        .sum();
    let outlier_rate_pct = if n_rows == 0 {
        0.0
    } else {
        outliers_detected as f64 / n_rows as f64 * 100.0
    };

    let climate: Vec<&NumericColumn> = columns
        .iter()
        .filter(|c| c.name.starts_with(CLIMATE_PREFIX))
        .collect();
    let climate_completeness_pct = rows_complete_pct(&climate, n_rows);

    Ok(DataQualityReport {
        n_rows,
        n_columns: table.num_columns(),
        pathway_completeness,
        overall_missing_pct,
        high_missing_columns,
        outliers_detected,
        outlier_rate_pct,
        climate_completeness_pct,
    })
}

impl DataQualityReport {
    /// Render the report as markdown
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut lines = vec![
            "# Data Quality Assessment".to_string(),
            String::new(),
            format!("- Observations: {}", self.n_rows),
            format!("- Variables: {}", self.n_columns),
            format!(
                "- Overall data completeness: {:.1}%",
                100.0 - self.overall_missing_pct
            ),
            format!("- Outlier detection rate: {:.2}%", self.outlier_rate_pct),
            format!(
                "- Climate data completeness: {:.1}%",
                self.climate_completeness_pct
            ),
            String::new(),
            "## Pathway completeness".to_string(),
            String::new(),
        ];
        for (pathway, entry) in &self.pathway_completeness {
            lines.push(format!(
                "- {pathway}: {} variables, {:.1}% complete",
                entry.variables_found, entry.completeness_pct
            ));
        }
        if !self.high_missing_columns.is_empty() {
            lines.push(String::new());
            lines.push(format!("## Variables with >{HIGH_MISSING_PCT:.0}% missing"));
            lines.push(String::new());
            lines.extend(self.high_missing_columns.iter().map(|c| format!("- {c}")));
        }
        lines.push(String::new());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::Float64Array;
    use arrow::datatypes::{DataType, Field, Schema};

    fn column(values: Vec<Option<f64>>) -> Arc<Float64Array> {
        Arc::new(Float64Array::from(values))
    }

    #[test]
    fn test_quality_report() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("climate_mean_temperature", DataType::Float64, true),
            Field::new("metabolic_glucose", DataType::Float64, true),
            Field::new("metabolic_hba1c", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                column(vec![Some(20.0), Some(21.0), None, Some(22.0)]),
                column(vec![Some(5.0), Some(5.1), Some(5.2), Some(50.0)]),
                column(vec![Some(6.0), None, None, None]),
            ],
        )
        .unwrap();

        let report = assess_quality(&batch, &ConfigRegistry::default()).unwrap();
        assert_eq!(report.pathway_completeness["metabolic"].variables_found, 2);
        assert!((report.pathway_completeness["metabolic"].completeness_pct - 25.0).abs() < 1e-9);
        assert_eq!(report.pathway_completeness["renal"].variables_found, 0);
        assert_eq!(report.high_missing_columns, vec!["metabolic_hba1c".to_string()]);
        assert_eq!(report.outliers_detected, 1);
        assert!((report.climate_completeness_pct - 75.0).abs() < 1e-9);
        assert!(report.to_markdown().contains("metabolic: 2 variables"));
    }
}
