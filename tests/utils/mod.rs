#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use heat_xai::{AnalysisConfig, ModelKind};

/// Build a table of nullable `Float64` columns
#[must_use]
pub fn float_table(columns: Vec<(&str, Vec<Option<f64>>)>) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, _)| Field::new(*name, DataType::Float64, true))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .into_iter()
        .map(|(_, values)| Arc::new(Float64Array::from(values)) as ArrayRef)
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).expect("valid test table")
}

/// Convenience for fully observed columns
#[must_use]
pub fn observed(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

/// Synthetic cohort with climate, demographic and biomarker columns
///
/// `metabolic_glucose` depends on temperature and BMI so a linear model has
/// signal to find. `renal_creatinine` is observed in the first
/// `renal_observed` rows only.
#[must_use]
pub fn synthetic_cohort(n_rows: usize, renal_observed: usize, seed: u64) -> RecordBatch {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date");

    let mut dates = Vec::with_capacity(n_rows);
    let mut mean_temp = Vec::with_capacity(n_rows);
    let mut max_temp = Vec::with_capacity(n_rows);
    let mut min_temp = Vec::with_capacity(n_rows);
    let mut heat_index = Vec::with_capacity(n_rows);
    let mut humidity = Vec::with_capacity(n_rows);
    let mut age = Vec::with_capacity(n_rows);
    let mut bmi = Vec::with_capacity(n_rows);
    let mut glucose = Vec::with_capacity(n_rows);
    let mut crp = Vec::with_capacity(n_rows);
    let mut systolic = Vec::with_capacity(n_rows);
    let mut diastolic = Vec::with_capacity(n_rows);
    let mut creatinine = Vec::with_capacity(n_rows);

    for i in 0..n_rows {
        let date = start.checked_add_days(Days::new(i as u64)).expect("date in range");
        dates.push(Some(date.format("%Y-%m-%d").to_string()));

        let t = 20.0 + 10.0 * ((i as f64) / 9.0).sin() + rng.random_range(-1.0..1.0);
        let b = rng.random_range(18.0..35.0);
        let a = rng.random_range(20.0..70.0);
        mean_temp.push(Some(t));
        max_temp.push(Some(t + rng.random_range(4.0..9.0)));
        min_temp.push(Some(t - rng.random_range(4.0..9.0)));
        heat_index.push(Some(t + 0.1 * rng.random_range(40.0..90.0)));
        humidity.push(Some(rng.random_range(40.0..90.0)));
        age.push(Some(a));
        bmi.push(Some(b));

        glucose.push(Some(3.0 + 0.08 * t + 0.05 * b + rng.random_range(-0.2..0.2)));
        crp.push(Some(rng.random_range(0.5..8.0)));
        let sbp = 110.0 + 0.3 * a + rng.random_range(-5.0..5.0);
        systolic.push(Some(sbp));
        diastolic.push(Some(sbp * 0.65));
        creatinine.push((i < renal_observed).then(|| rng.random_range(60.0..120.0)));
    }

    let float = |values: Vec<Option<f64>>| Arc::new(Float64Array::from(values)) as ArrayRef;
    let columns: Vec<(&str, ArrayRef)> = vec![
        ("visit_date", Arc::new(StringArray::from(dates)) as ArrayRef),
        ("climate_mean_temperature", float(mean_temp)),
        ("climate_max_temperature", float(max_temp)),
        ("climate_min_temperature", float(min_temp)),
        ("climate_heat_index", float(heat_index)),
        ("climate_mean_humidity", float(humidity)),
        ("demographic_age", float(age)),
        ("demographic_bmi", float(bmi)),
        ("metabolic_glucose", float(glucose)),
        ("inflammatory_crp", float(crp)),
        ("cardiovascular_systolic_bp_average", float(systolic)),
        ("cardiovascular_diastolic_bp_average", float(diastolic)),
        ("renal_creatinine", float(creatinine)),
    ];
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns.into_iter().map(|(_, a)| a).collect(),
    )
    .expect("valid synthetic cohort")
}

/// Small, fast analysis parameters for integration tests
#[must_use]
pub fn fast_config() -> AnalysisConfig {
    AnalysisConfig {
        lag_periods: vec![1, 2],
        rolling_windows: vec![3],
        model_types: vec![ModelKind::ElasticNet],
        cv_folds: 3,
        // the whole elastic-net grid
        search_iterations: 12,
        shap_sample_size: 20,
        shap_permutations: 2,
        ..AnalysisConfig::default()
    }
}
