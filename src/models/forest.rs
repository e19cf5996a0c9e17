//! Random forest regressor
//!
//! Trees are grown in parallel on bootstrap samples; tree `i` draws from
//! its own generator seeded with `seed + i`, so results do not depend on
//! thread scheduling.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use super::{FitError, Regressor, normalize, validate_training_data};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of features considered at each split
    pub max_features: f64,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 1.0,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    fn tree_params(&self, n_features: usize) -> TreeParams {
        let max_features = ((self.max_features * n_features as f64).round() as usize).max(1);
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: Some(max_features),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    importance: Vec<f64>,
}

impl RandomForest {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[f64],
        params: &ForestParams,
        seed: u64,
    ) -> Result<Self, FitError> {
        validate_training_data(x, y)?;
        if params.n_estimators == 0 {
            return Err(FitError::InvalidParameter("n_estimators must be positive".into()));
        }

        let n = x.nrows();
        let tree_params = params.tree_params(x.ncols());

        let trees: Vec<RegressionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let rows = if params.bootstrap {
                    (0..n).map(|_| rng.random_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(x, y, rows, &tree_params, &mut rng)
            })
            .collect();

        let mut importance = vec![0.0; x.ncols()];
        for tree in &trees {
            for (acc, v) in importance.iter_mut().zip(normalize(tree.feature_importance())) {
                *acc += v;
            }
        }

        Ok(Self {
            importance: normalize(&importance),
            trees,
        })
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForest {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    fn feature_importance(&self) -> Vec<f64> {
        self.importance.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn data() -> (Array2<f64>, Vec<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = (0..40).map(|i| if i < 20 { 0.0 } else { 10.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_forest_is_deterministic_and_informative() {
        let (x, y) = data();
        let params = ForestParams {
            n_estimators: 20,
            ..ForestParams::default()
        };
        let a = RandomForest::fit(x.view(), &y, &params, 7).unwrap();
        let b = RandomForest::fit(x.view(), &y, &params, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n_trees(), 20);

        let importance = a.feature_importance();
        assert!(importance[0] > importance[1]);
        assert!((importance.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(a.predict_row(x.row(35)) > 5.0);
    }

    #[test]
    fn test_empty_training_set_rejected() {
        let x = Array2::<f64>::zeros((0, 2));
        assert!(RandomForest::fit(x.view(), &[], &ForestParams::default(), 0).is_err());
    }
}
