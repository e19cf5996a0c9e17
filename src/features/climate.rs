//! Climate-derived features: temperature range and heat-stress indicators

use arrow::record_batch::RecordBatch;

use super::FeatureOutcome;
use crate::error::Result;
use crate::utils::arrow_utils::{float_column, has_column, with_float_columns};

pub const MAX_TEMPERATURE: &str = "climate_max_temperature";
pub const MIN_TEMPERATURE: &str = "climate_min_temperature";
pub const TEMP_RANGE: &str = "climate_temp_range";
pub const HEAT_STRESS_MODERATE: &str = "climate_heat_stress_moderate";
pub const HEAT_STRESS_SEVERE: &str = "climate_heat_stress_severe";

/// Maximum temperature (°C) above which a day counts as moderate heat stress
pub const MODERATE_HEAT_C: f64 = 30.0;

/// Maximum temperature (°C) above which a day counts as severe heat stress
pub const SEVERE_HEAT_C: f64 = 35.0;

fn indicator(values: &[f64], threshold: f64) -> Vec<f64> {
    values
        .iter()
        .map(|v| {
            if v.is_nan() {
                f64::NAN
            } else if *v > threshold {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Add temperature range and heat-stress indicator columns
///
/// Each feature is created only when its inputs are present. A missing
/// maximum temperature yields a missing indicator rather than `0`.
pub fn add_climate_features(table: &RecordBatch) -> Result<(RecordBatch, FeatureOutcome)> {
    let mut outcome = FeatureOutcome::default();
    let mut derived = Vec::new();

    outcome.requested.push(TEMP_RANGE.to_string());
    if has_column(table, MAX_TEMPERATURE) && has_column(table, MIN_TEMPERATURE) {
        let max = float_column(table, MAX_TEMPERATURE)?;
        let min = float_column(table, MIN_TEMPERATURE)?;
        let range = max.iter().zip(&min).map(|(hi, lo)| hi - lo).collect();
        derived.push((TEMP_RANGE.to_string(), range));
    } else {
        outcome.skip(TEMP_RANGE, "requires maximum and minimum temperature");
    }

    outcome
        .requested
        .extend([HEAT_STRESS_MODERATE.to_string(), HEAT_STRESS_SEVERE.to_string()]);
    if has_column(table, MAX_TEMPERATURE) {
        let max = float_column(table, MAX_TEMPERATURE)?;
        derived.push((HEAT_STRESS_MODERATE.to_string(), indicator(&max, MODERATE_HEAT_C)));
        derived.push((HEAT_STRESS_SEVERE.to_string(), indicator(&max, SEVERE_HEAT_C)));
    } else {
        outcome.skip(HEAT_STRESS_MODERATE, "requires maximum temperature");
        outcome.skip(HEAT_STRESS_SEVERE, "requires maximum temperature");
    }

    outcome.created = derived.iter().map(|(name, _)| name.clone()).collect();
    let table = with_float_columns(table, derived)?;
    log::info!("Created {} climate features", outcome.created.len());
    Ok((table, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::Float64Array;
    use arrow::datatypes::{DataType, Field, Schema};

    #[test]
    fn test_heat_stress_indicators() {
        let schema = Arc::new(Schema::new(vec![
            Field::new(MAX_TEMPERATURE, DataType::Float64, true),
            Field::new(MIN_TEMPERATURE, DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![Some(28.0), Some(32.0), Some(36.0), None])),
                Arc::new(Float64Array::from(vec![Some(15.0), Some(18.0), Some(20.0), Some(10.0)])),
            ],
        )
        .unwrap();

        let (table, outcome) = add_climate_features(&batch).unwrap();
        assert_eq!(outcome.created.len(), 3);
        assert!(outcome.skipped.is_empty());

        let moderate = float_column(&table, HEAT_STRESS_MODERATE).unwrap();
        assert_eq!(&moderate[..3], &[0.0, 1.0, 1.0]);
        assert!(moderate[3].is_nan());
        let severe = float_column(&table, HEAT_STRESS_SEVERE).unwrap();
        assert_eq!(&severe[..3], &[0.0, 0.0, 1.0]);
        let range = float_column(&table, TEMP_RANGE).unwrap();
        assert_eq!(&range[..3], &[13.0, 14.0, 16.0]);
    }

    #[test]
    fn test_missing_inputs_are_reported() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            MIN_TEMPERATURE,
            DataType::Float64,
            true,
        )]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Float64Array::from(vec![1.0, 2.0]))])
                .unwrap();
        let (table, outcome) = add_climate_features(&batch).unwrap();
        assert_eq!(table.num_columns(), 1);
        assert!(outcome.created.is_empty());
        assert_eq!(outcome.skipped.len(), 3);
    }
}
