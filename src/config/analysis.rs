//! Run-wide analysis parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::models::ModelKind;

/// Configuration for analysis parameters
///
/// Immutable during a run; adjust with [`AnalysisConfig::with_overrides`],
/// which validates every value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Seed for splits, CV folds, model fitting and attribution sampling
    pub random_seed: u64,
    /// Lag periods in rows (days for daily data)
    pub lag_periods: Vec<usize>,
    /// Trailing rolling-mean windows in rows
    pub rolling_windows: Vec<usize>,
    /// Extra interaction column names accepted as predictors when present
    pub interaction_terms: Vec<String>,
    /// Candidate model families for the optimizer
    pub model_types: Vec<ModelKind>,
    /// Cross-validation folds
    pub cv_folds: usize,
    /// Held-out test fraction
    pub test_size: f64,
    /// Cap on rows explained by the attribution analyzer
    pub shap_sample_size: usize,
    /// Test R² that must be exceeded before attribution runs
    pub min_predictive_threshold: f64,
    /// Minimum clean rows for a pathway to be analyzable
    pub min_samples: usize,
    /// Columns with a larger missing fraction are dropped after feature engineering
    pub max_missing_fraction: f64,
    /// Hyperparameter candidates sampled per model family
    pub search_iterations: usize,
    /// Feature permutations averaged per explained row
    pub shap_permutations: usize,
    /// Reject log/sqrt domain violations instead of producing non-finite targets
    pub strict_transforms: bool,
    /// Run the per-pathway loop on the rayon pool
    pub parallel_pathways: bool,
    /// Also offer climate lag/rolling columns as predictors
    pub temporal_predictors: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            random_seed: 42,
            lag_periods: vec![7, 14, 21, 28],
            rolling_windows: vec![3, 7, 14],
            interaction_terms: vec![
                "climate_temp_x_bmi".to_string(),
                "climate_temp_x_age".to_string(),
                "climate_humidity_x_bmi".to_string(),
            ],
            model_types: vec![
                ModelKind::RandomForest,
                ModelKind::GradientBoosting,
                ModelKind::ElasticNet,
            ],
            cv_folds: 5,
            test_size: 0.3,
            shap_sample_size: 1000,
            min_predictive_threshold: 0.01,
            min_samples: 50,
            max_missing_fraction: 0.7,
            search_iterations: 10,
            shap_permutations: 10,
            strict_transforms: false,
            parallel_pathways: false,
            temporal_predictors: false,
        }
    }
}

/// Optional overrides for [`AnalysisConfig`], typically read from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisOverrides {
    pub random_seed: Option<u64>,
    pub lag_periods: Option<Vec<usize>>,
    pub rolling_windows: Option<Vec<usize>>,
    pub interaction_terms: Option<Vec<String>>,
    pub model_types: Option<Vec<ModelKind>>,
    pub cv_folds: Option<usize>,
    pub test_size: Option<f64>,
    pub shap_sample_size: Option<usize>,
    pub min_predictive_threshold: Option<f64>,
    pub min_samples: Option<usize>,
    pub max_missing_fraction: Option<f64>,
    pub search_iterations: Option<usize>,
    pub shap_permutations: Option<usize>,
    pub strict_transforms: Option<bool>,
    pub parallel_pathways: Option<bool>,
    pub temporal_predictors: Option<bool>,
}

impl AnalysisOverrides {
    /// Parse overrides from YAML; unknown keys are rejected
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

impl AnalysisConfig {
    /// Apply overrides and validate the result
    pub fn with_overrides(self, overrides: AnalysisOverrides) -> Result<Self> {
        let AnalysisOverrides {
            random_seed,
            lag_periods,
            rolling_windows,
            interaction_terms,
            model_types,
            cv_folds,
            test_size,
            shap_sample_size,
            min_predictive_threshold,
            min_samples,
            max_missing_fraction,
            search_iterations,
            shap_permutations,
            strict_transforms,
            parallel_pathways,
            temporal_predictors,
        } = overrides;

        let config = Self {
            random_seed: random_seed.unwrap_or(self.random_seed),
            lag_periods: lag_periods.unwrap_or(self.lag_periods),
            rolling_windows: rolling_windows.unwrap_or(self.rolling_windows),
            interaction_terms: interaction_terms.unwrap_or(self.interaction_terms),
            model_types: model_types.unwrap_or(self.model_types),
            cv_folds: cv_folds.unwrap_or(self.cv_folds),
            test_size: test_size.unwrap_or(self.test_size),
            shap_sample_size: shap_sample_size.unwrap_or(self.shap_sample_size),
            min_predictive_threshold: min_predictive_threshold
                .unwrap_or(self.min_predictive_threshold),
            min_samples: min_samples.unwrap_or(self.min_samples),
            max_missing_fraction: max_missing_fraction.unwrap_or(self.max_missing_fraction),
            search_iterations: search_iterations.unwrap_or(self.search_iterations),
            shap_permutations: shap_permutations.unwrap_or(self.shap_permutations),
            strict_transforms: strict_transforms.unwrap_or(self.strict_transforms),
            parallel_pathways: parallel_pathways.unwrap_or(self.parallel_pathways),
            temporal_predictors: temporal_predictors.unwrap_or(self.temporal_predictors),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every numeric parameter is in range
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AnalysisError::InvalidConfig(msg));

        if self.lag_periods.contains(&0) {
            return invalid("lag periods must be positive".to_string());
        }
        if self.rolling_windows.contains(&0) {
            return invalid("rolling windows must be positive".to_string());
        }
        if self.model_types.is_empty() {
            return invalid("at least one model type is required".to_string());
        }
        if self.cv_folds < 2 {
            return invalid(format!("cv_folds must be at least 2, got {}", self.cv_folds));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return invalid(format!("test_size must be in (0, 1), got {}", self.test_size));
        }
        if self.shap_sample_size == 0 {
            return invalid("shap_sample_size must be positive".to_string());
        }
        if !self.min_predictive_threshold.is_finite() {
            return invalid("min_predictive_threshold must be finite".to_string());
        }
        if self.min_samples < 2 {
            return invalid(format!("min_samples must be at least 2, got {}", self.min_samples));
        }
        if !(0.0..=1.0).contains(&self.max_missing_fraction) {
            return invalid(format!(
                "max_missing_fraction must be in [0, 1], got {}",
                self.max_missing_fraction
            ));
        }
        if self.search_iterations == 0 {
            return invalid("search_iterations must be positive".to_string());
        }
        if self.shap_permutations == 0 {
            return invalid("shap_permutations must be positive".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analysis Configuration:")?;
        writeln!(f, "  Random Seed: {}", self.random_seed)?;
        writeln!(f, "  Lag Periods: {:?}", self.lag_periods)?;
        writeln!(f, "  Rolling Windows: {:?}", self.rolling_windows)?;
        writeln!(f, "  Model Types: {:?}", self.model_types)?;
        writeln!(f, "  CV Folds: {}", self.cv_folds)?;
        writeln!(f, "  Test Size: {}", self.test_size)?;
        writeln!(f, "  SHAP Sample Size: {}", self.shap_sample_size)?;
        writeln!(f, "  Min Predictive R²: {}", self.min_predictive_threshold)?;
        writeln!(f, "  Min Samples: {}", self.min_samples)?;
        Ok(())
    }
}
