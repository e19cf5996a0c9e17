//! Gradient-boosted regression trees with squared loss

use ndarray::{ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use super::{FitError, Regressor, normalize, validate_training_data};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each stage
    pub subsample: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    importance: Vec<f64>,
}

impl GradientBoosting {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[f64],
        params: &BoostingParams,
        seed: u64,
    ) -> Result<Self, FitError> {
        validate_training_data(x, y)?;
        if !(params.subsample > 0.0 && params.subsample <= 1.0) {
            return Err(FitError::InvalidParameter(format!(
                "subsample must be in (0, 1], got {}",
                params.subsample
            )));
        }
        if !(params.learning_rate > 0.0) {
            return Err(FitError::InvalidParameter("learning_rate must be positive".into()));
        }

        let n = x.nrows();
        let init = y.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![init; n];
        let mut rng = StdRng::seed_from_u64(seed);
        let tree_params = TreeParams {
            max_depth: Some(params.max_depth),
            min_samples_split: 2,
            min_samples_leaf: params.min_samples_leaf,
            max_features: None,
        };
        let stage_rows = ((params.subsample * n as f64).round() as usize).clamp(1, n);

        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut importance = vec![0.0; x.ncols()];

        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&predictions).map(|(t, p)| t - p).collect();
            let rows = if stage_rows < n {
                index::sample(&mut rng, n, stage_rows).into_vec()
            } else {
                (0..n).collect()
            };

            let tree = RegressionTree::fit(x, &residuals, rows, &tree_params, &mut rng);
            for (pred, row) in predictions.iter_mut().zip(x.outer_iter()) {
                *pred += params.learning_rate * tree.predict_row(row);
            }
            for (acc, v) in importance.iter_mut().zip(tree.feature_importance()) {
                *acc += v;
            }
            trees.push(tree);
        }

        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            trees,
            importance: normalize(&importance),
        })
    }
}

impl Regressor for GradientBoosting {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.init
            + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    fn feature_importance(&self) -> Vec<f64> {
        self.importance.clone()
    }
}
