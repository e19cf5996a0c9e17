//! Feature engineering: climate, temporal and interaction features
//!
//! Each engineer is a pure function from a table to a new table plus a
//! [`FeatureOutcome`] listing which named features were requested,
//! created and skipped. [`engineer_features`] runs them in order
//! (climate → temporal → interaction) and then drops sparse columns.

pub mod climate;
pub mod interactions;
pub mod temporal;

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::config::{AnalysisConfig, ConfigRegistry};
use crate::error::Result;
use crate::utils::arrow_utils::{array_to_f64, drop_columns};

pub use climate::add_climate_features;
pub use interactions::add_interaction_features;
pub use temporal::add_temporal_features;

/// A requested feature that was not created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFeature {
    pub name: String,
    pub reason: String,
}

/// Requested vs. materialized features for one engineer call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureOutcome {
    pub requested: Vec<String>,
    pub created: Vec<String>,
    pub skipped: Vec<SkippedFeature>,
}

impl FeatureOutcome {
    pub(crate) fn skip(&mut self, name: &str, reason: &str) {
        log::debug!("Skipping feature {name}: {reason}");
        self.skipped.push(SkippedFeature {
            name: name.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Which optional engineers to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOptions {
    pub temporal: bool,
    pub interactions: bool,
    /// Column used to order rows for lags; positional order when `None`
    pub date_column: Option<String>,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            temporal: true,
            interactions: true,
            date_column: None,
        }
    }
}

/// What feature engineering did to the table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureEngineeringReport {
    pub climate: FeatureOutcome,
    pub temporal: Option<FeatureOutcome>,
    pub interactions: Option<FeatureOutcome>,
    /// Columns removed for exceeding the missing-fraction limit
    pub dropped_sparse: Vec<String>,
    pub n_columns_before: usize,
    pub n_columns_after: usize,
}

/// Fraction of missing entries in every column, in schema order
///
/// Numeric columns count both nulls and `NaN`; other columns count nulls.
pub fn missing_fractions(table: &RecordBatch) -> Result<Vec<(String, f64)>> {
    let n_rows = table.num_rows();
    let schema = table.schema();
    let mut fractions = Vec::with_capacity(table.num_columns());
    for (field, array) in schema.fields().iter().zip(table.columns()) {
        let missing = if field.data_type().is_numeric() {
            array_to_f64(array)?.iter().filter(|v| v.is_nan()).count()
        } else {
            array.null_count()
        };
        let fraction = if n_rows == 0 {
            0.0
        } else {
            missing as f64 / n_rows as f64
        };
        fractions.push((field.name().clone(), fraction));
    }
    Ok(fractions)
}

/// Remove columns whose missing fraction exceeds `max_missing_fraction`
pub fn drop_sparse_columns(
    table: &RecordBatch,
    max_missing_fraction: f64,
) -> Result<(RecordBatch, Vec<String>)> {
    let dropped: Vec<String> = missing_fractions(table)?
        .into_iter()
        .filter(|(_, fraction)| *fraction > max_missing_fraction)
        .map(|(name, _)| name)
        .collect();
    if !dropped.is_empty() {
        log::warn!(
            "Dropping {} columns with more than {:.0}% missing values",
            dropped.len(),
            max_missing_fraction * 100.0
        );
    }
    Ok((drop_columns(table, &dropped)?, dropped))
}

/// Run the climate, temporal and interaction engineers, then drop sparse columns
pub fn engineer_features(
    table: &RecordBatch,
    registry: &ConfigRegistry,
    config: &AnalysisConfig,
    options: &FeatureOptions,
) -> Result<(RecordBatch, FeatureEngineeringReport)> {
    let n_columns_before = table.num_columns();

    let (mut features, climate) = add_climate_features(table)?;

    let temporal = if options.temporal {
        let (next, outcome) = add_temporal_features(
            &features,
            options.date_column.as_deref(),
            &config.lag_periods,
            &config.rolling_windows,
        )?;
        features = next;
        Some(outcome)
    } else {
        None
    };

    let interactions = if options.interactions {
        let (next, outcome) = add_interaction_features(&features, registry)?;
        features = next;
        Some(outcome)
    } else {
        None
    };

    let (features, dropped_sparse) = drop_sparse_columns(&features, config.max_missing_fraction)?;

    let report = FeatureEngineeringReport {
        climate,
        temporal,
        interactions,
        dropped_sparse,
        n_columns_before,
        n_columns_after: features.num_columns(),
    };
    log::info!(
        "Features engineered: {} -> {} columns",
        report.n_columns_before,
        report.n_columns_after
    );
    Ok((features, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    #[test]
    fn test_drop_sparse_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("climate_temp", DataType::Float64, true),
            Field::new("metabolic_insulin", DataType::Float64, true),
            Field::new("site", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![Some(1.0), Some(2.0), None, Some(4.0)])),
                Arc::new(Float64Array::from(vec![Some(f64::NAN), None, None, Some(1.0)])),
                Arc::new(StringArray::from(vec![Some("a"), None, None, None])),
            ],
        )
        .unwrap();

        let (table, dropped) = drop_sparse_columns(&batch, 0.7).unwrap();
        assert_eq!(dropped, vec!["metabolic_insulin".to_string(), "site".to_string()]);
        assert_eq!(table.num_columns(), 1);
    }
}
