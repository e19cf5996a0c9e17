//! Pathway target creation
//!
//! The transform's own median fill (for `log` and `sqrt`) is the only
//! imputation done here; predictor imputation happens per pathway in the
//! orchestrator.

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::config::{PathwayConfig, Transform};
use crate::error::{AnalysisError, Result};
use crate::utils::arrow_utils::float_column;
use crate::utils::stats;

/// Parameters needed to invert a `standardize` transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardizeParams {
    pub mean: f64,
    pub std: f64,
}

/// Where a pathway target came from and how it was transformed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetProvenance {
    pub pathway: String,
    pub original_column: String,
    pub transform: Transform,
    /// Finite values after the transform
    pub n_valid: usize,
    /// Percentage of non-finite values after the transform
    pub missing_pct: f64,
    /// Missing values in the raw column
    pub raw_missing: usize,
    /// Values the transform itself made non-finite (domain violations)
    pub n_non_finite: usize,
    pub params: Option<StandardizeParams>,
    /// Raw observed values per reporting threshold band
    #[serde(default)]
    pub threshold_bands: BTreeMap<String, usize>,
}

/// A transformed target series with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct PathwayTarget {
    /// One value per table row; `NaN` or infinite where unusable
    pub values: Vec<f64>,
    pub provenance: TargetProvenance,
}

impl Transform {
    /// Map a transformed value back to the raw scale
    ///
    /// `standardize` needs the parameters recorded at creation and returns
    /// `None` without them.
    #[must_use]
    pub fn inverse(self, value: f64, params: Option<&StandardizeParams>) -> Option<f64> {
        match self {
            Self::None => Some(value),
            Self::Log => Some(value.exp_m1()),
            Self::Sqrt => Some(value * value),
            Self::Standardize => params.map(|p| value * p.std + p.mean),
        }
    }
}

/// Builds pathway targets from raw biomarker columns
#[derive(Debug, Clone, Copy, Default)]
pub struct PathwayTargetCreator {
    /// Reject domain violations instead of producing non-finite values
    pub strict_transforms: bool,
}

impl PathwayTargetCreator {
    #[must_use]
    pub const fn new(strict_transforms: bool) -> Self {
        Self { strict_transforms }
    }

    /// Create the target series for a pathway
    ///
    /// # Errors
    /// `MissingColumn` if the target column is absent; `InvalidTransform` in
    /// strict mode when the transform leaves non-finite values behind.
    pub fn create_target(&self, table: &RecordBatch, pathway: &PathwayConfig) -> Result<PathwayTarget> {
        let raw = float_column(table, &pathway.target)?;
        let raw_missing = raw.len() - stats::count_present(&raw);

        let mut params = None;
        let values: Vec<f64> = match pathway.transform {
            Transform::None => raw.clone(),
            Transform::Log => median_filled(&raw).into_iter().map(f64::ln_1p).collect(),
            Transform::Sqrt => median_filled(&raw).into_iter().map(f64::sqrt).collect(),
            Transform::Standardize => {
                let mean = stats::mean(&raw);
                let std = stats::std_dev(&raw);
                params = Some(StandardizeParams { mean, std });
                raw.iter().map(|v| (v - mean) / std).collect()
            }
        };

        let n_non_finite = domain_violations(&raw, &values, pathway.transform);
        if n_non_finite > 0 {
            let reason = format!("{n_non_finite} values became non-finite");
            if self.strict_transforms {
                return Err(AnalysisError::InvalidTransform {
                    column: pathway.target.clone(),
                    transform: pathway.transform.to_string(),
                    reason,
                });
            }
            log::warn!(
                "Target '{}' for pathway '{}' under '{}' transform: {reason}; these rows will be removed",
                pathway.target,
                pathway.name,
                pathway.transform
            );
        }

        let mut threshold_bands = BTreeMap::new();
        for band in raw.iter().filter_map(|v| pathway.threshold_band(*v)) {
            *threshold_bands.entry(band.to_string()).or_insert(0) += 1;
        }

        let n_valid = values.iter().filter(|v| v.is_finite()).count();
        let missing_pct = if values.is_empty() {
            0.0
        } else {
            (values.len() - n_valid) as f64 / values.len() as f64 * 100.0
        };

        log::debug!(
            "Target '{}' ({}): {n_valid} valid, {missing_pct:.1}% missing",
            pathway.target,
            pathway.transform
        );

        Ok(PathwayTarget {
            values,
            provenance: TargetProvenance {
                pathway: pathway.name.clone(),
                original_column: pathway.target.clone(),
                transform: pathway.transform,
                n_valid,
                missing_pct,
                raw_missing,
                n_non_finite,
                params,
                threshold_bands,
            },
        })
    }
}

/// Create a pathway target with the default (lenient) policy
pub fn create_target(table: &RecordBatch, pathway: &PathwayConfig) -> Result<PathwayTarget> {
    PathwayTargetCreator::default().create_target(table, pathway)
}

fn median_filled(raw: &[f64]) -> Vec<f64> {
    let median = stats::median(raw);
    raw.iter()
        .map(|v| if v.is_nan() { median } else { *v })
        .collect()
}

/// Values that were usable before the transform and are not after it
///
/// For median-filling transforms every raw value counts as usable, since
/// missing entries are filled first.
fn domain_violations(raw: &[f64], transformed: &[f64], transform: Transform) -> usize {
    raw.iter()
        .zip(transformed)
        .filter(|(r, t)| (transform.fills_missing() || r.is_finite()) && !t.is_finite())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::Float64Array;
    use arrow::datatypes::{DataType, Field, Schema};

    fn table(values: Vec<Option<f64>>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "inflammatory_crp",
            DataType::Float64,
            true,
        )]));
        RecordBatch::try_new(schema, vec![Arc::new(Float64Array::from(values))]).unwrap()
    }

    fn pathway(transform: Transform) -> PathwayConfig {
        PathwayConfig::new("inflammatory", "inflammatory_crp").with_transform(transform)
    }

    #[test]
    fn test_none_keeps_missing() {
        let target = create_target(&table(vec![Some(1.0), None]), &pathway(Transform::None)).unwrap();
        assert_eq!(target.values[0], 1.0);
        assert!(target.values[1].is_nan());
        assert_eq!(target.provenance.n_valid, 1);
        assert!((target.provenance.missing_pct - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_log_fills_median_first() {
        let target = create_target(
            &table(vec![Some(1.0), None, Some(3.0)]),
            &pathway(Transform::Log),
        )
        .unwrap();
        assert!((target.values[1] - 2.0_f64.ln_1p()).abs() < 1e-12);
        assert_eq!(target.provenance.n_valid, 3);
        assert_eq!(target.provenance.raw_missing, 1);
    }

    #[test]
    fn test_sqrt_domain_violation_policy() {
        let data = table(vec![Some(4.0), Some(-1.0), Some(9.0)]);
        let lenient = create_target(&data, &pathway(Transform::Sqrt)).unwrap();
        assert!(lenient.values[1].is_nan());
        assert_eq!(lenient.provenance.n_non_finite, 1);

        let strict = PathwayTargetCreator::new(true).create_target(&data, &pathway(Transform::Sqrt));
        assert!(matches!(strict, Err(AnalysisError::InvalidTransform { .. })));
    }

    #[test]
    fn test_log_below_minus_one_is_non_finite() {
        let target = create_target(&table(vec![Some(-1.0), Some(0.0)]), &pathway(Transform::Log)).unwrap();
        assert!(target.values[0].is_infinite());
        assert_eq!(target.provenance.n_non_finite, 1);
        assert_eq!(target.provenance.n_valid, 1);
    }

    #[test]
    fn test_standardize_round_trip() {
        let raw = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let target = create_target(
            &table(raw.iter().copied().map(Some).collect()),
            &pathway(Transform::Standardize),
        )
        .unwrap();
        let params = target.provenance.params.unwrap();
        for (z, original) in target.values.iter().zip(&raw) {
            let back = Transform::Standardize.inverse(*z, Some(&params)).unwrap();
            assert!((back - original).abs() < 1e-9);
        }
    }

    #[test]
    fn test_standardize_does_not_impute() {
        let target = create_target(
            &table(vec![Some(1.0), None, Some(3.0)]),
            &pathway(Transform::Standardize),
        )
        .unwrap();
        assert!(target.values[1].is_nan());
        assert_eq!(target.provenance.n_non_finite, 0);
    }

    #[test]
    fn test_raw_values_counted_per_threshold_band() {
        let config = pathway(Transform::Log)
            .with_threshold("high", 5.0)
            .with_threshold("moderate", 3.0);
        let target = create_target(
            &table(vec![Some(1.0), Some(3.5), Some(4.0), Some(8.0), None]),
            &config,
        )
        .unwrap();
        let bands = &target.provenance.threshold_bands;
        assert_eq!(bands.get("moderate"), Some(&2));
        assert_eq!(bands.get("high"), Some(&1));
        assert_eq!(bands.values().sum::<usize>(), 3);
    }

    #[test]
    fn test_missing_target_column() {
        let err = create_target(&table(vec![Some(1.0)]), &PathwayConfig::new("renal", "renal_creatinine"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn { .. }));
    }
}
