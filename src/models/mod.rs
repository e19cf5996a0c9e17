//! Regression models, metrics and model selection
//!
//! - [`ModelKind`]: the closed set of model families
//! - [`Hyperparameters`]: tagged parameters for one family
//! - [`FittedModel`]: a fitted model of any family behind one interface
//! - [`optimizer`]: randomized hyperparameter search with k-fold CV

pub mod boosting;
pub mod forest;
pub mod linear;
pub mod metrics;
pub mod optimizer;
pub mod split;
pub mod tree;

use std::fmt;

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

pub use boosting::{BoostingParams, GradientBoosting};
pub use forest::{ForestParams, RandomForest};
pub use linear::{ElasticNet, ElasticNetParams};
pub use metrics::{mae, r2_score, rmse};
pub use optimizer::{ModelOptimizer, OptimizedModel, RandomizedSearchOptimizer};
pub use split::{KFold, TrainTestSplit, train_test_split};

/// Errors raised while fitting or selecting a model
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("feature matrix has {rows} rows but target has {targets} values")]
    ShapeMismatch { rows: usize, targets: usize },

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("need at least {required} samples, got {available}")]
    TooFewSamples { available: usize, required: usize },

    #[error("invalid hyperparameter: {0}")]
    InvalidParameter(String),

    #[error("no candidate model could be fitted: {0}")]
    NoCandidate(String),
}

pub(crate) fn validate_training_data(x: ArrayView2<'_, f64>, y: &[f64]) -> Result<(), FitError> {
    if x.nrows() == 0 {
        return Err(FitError::EmptyTrainingSet);
    }
    if x.nrows() != y.len() {
        return Err(FitError::ShapeMismatch {
            rows: x.nrows(),
            targets: y.len(),
        });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite("feature matrix"));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite("target"));
    }
    Ok(())
}

/// Scale non-negative values to sum to one; all zeros stay zero
pub(crate) fn normalize(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// Prediction and importance for a fitted model
pub trait Regressor {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64;

    fn feature_importance(&self) -> Vec<f64>;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.outer_iter().map(|row| self.predict_row(row)).collect()
    }
}

/// Supported model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    GradientBoosting,
    ElasticNet,
}

impl ModelKind {
    pub const ALL: [Self; 3] = [Self::RandomForest, Self::GradientBoosting, Self::ElasticNet];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RandomForest => "random_forest",
            Self::GradientBoosting => "gradient_boosting",
            Self::ElasticNet => "elastic_net",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hyperparameters for one model family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Hyperparameters {
    RandomForest(ForestParams),
    GradientBoosting(BoostingParams),
    ElasticNet(ElasticNetParams),
}

impl Hyperparameters {
    #[must_use]
    pub const fn kind(&self) -> ModelKind {
        match self {
            Self::RandomForest(_) => ModelKind::RandomForest,
            Self::GradientBoosting(_) => ModelKind::GradientBoosting,
            Self::ElasticNet(_) => ModelKind::ElasticNet,
        }
    }

    /// Fit a model of this family
    pub fn fit(&self, x: ArrayView2<'_, f64>, y: &[f64], seed: u64) -> Result<FittedModel, FitError> {
        Ok(match self {
            Self::RandomForest(p) => FittedModel::RandomForest(RandomForest::fit(x, y, p, seed)?),
            Self::GradientBoosting(p) => {
                FittedModel::GradientBoosting(GradientBoosting::fit(x, y, p, seed)?)
            }
            Self::ElasticNet(p) => FittedModel::ElasticNet(ElasticNet::fit(x, y, p)?),
        })
    }
}

/// A fitted model of any supported family
#[derive(Debug, Clone, PartialEq)]
pub enum FittedModel {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    ElasticNet(ElasticNet),
}

impl FittedModel {
    #[must_use]
    pub const fn kind(&self) -> ModelKind {
        match self {
            Self::RandomForest(_) => ModelKind::RandomForest,
            Self::GradientBoosting(_) => ModelKind::GradientBoosting,
            Self::ElasticNet(_) => ModelKind::ElasticNet,
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            Self::RandomForest(m) => m,
            Self::GradientBoosting(m) => m,
            Self::ElasticNet(m) => m,
        }
    }
}

impl Regressor for FittedModel {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.inner().predict_row(row)
    }

    fn feature_importance(&self) -> Vec<f64> {
        self.inner().feature_importance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_hyperparameters_dispatch_by_variant() {
        let x = Array2::from_shape_fn((12, 1), |(i, _)| i as f64);
        let y: Vec<f64> = (0..12).map(|i| 2.0 * i as f64).collect();
        let params = Hyperparameters::ElasticNet(ElasticNetParams {
            alpha: 0.001,
            ..ElasticNetParams::default()
        });
        let model = params.fit(x.view(), &y, 0).unwrap();
        assert_eq!(model.kind(), ModelKind::ElasticNet);
        assert_eq!(model.predict(x.view()).len(), 12);
        assert_eq!(model.feature_importance().len(), 1);
    }

    #[test]
    fn test_model_kind_names() {
        let parsed: Vec<ModelKind> =
            serde_yaml::from_str("[random_forest, gradient_boosting, elastic_net]").unwrap();
        assert_eq!(parsed, ModelKind::ALL.to_vec());
        let json = serde_json::to_string(&Hyperparameters::ElasticNet(ElasticNetParams::default()))
            .unwrap();
        assert!(json.contains("\"model\":\"elastic_net\""));
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let x = Array2::from_elem((3, 1), f64::NAN);
        assert!(matches!(
            validate_training_data(x.view(), &[1.0, 2.0, 3.0]),
            Err(FitError::NonFinite(_))
        ));
    }
}
