//! Hyperparameter search
//!
//! [`RandomizedSearchOptimizer`] samples candidates from a fixed grid per
//! model family, scores each by mean k-fold R², and refits the best
//! candidate on the full training partition.

use itertools::iproduct;
use ndarray::{ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

use super::split::KFold;
use super::{
    BoostingParams, ElasticNetParams, FitError, FittedModel, ForestParams, Hyperparameters,
    ModelKind, Regressor, r2_score,
};
use crate::config::AnalysisConfig;
use crate::utils::logging::{create_search_progress_bar, finish_progress_bar};

/// The selected model with its parameters and cross-validation scores
#[derive(Debug, Clone)]
pub struct OptimizedModel {
    pub model: FittedModel,
    pub params: Hyperparameters,
    /// Per-fold R² of the selected candidate
    pub cv_scores: Vec<f64>,
}

impl OptimizedModel {
    #[must_use]
    pub fn cv_mean(&self) -> f64 {
        if self.cv_scores.is_empty() {
            return f64::NAN;
        }
        self.cv_scores.iter().sum::<f64>() / self.cv_scores.len() as f64
    }

    /// Population standard deviation of the fold scores
    #[must_use]
    pub fn cv_std(&self) -> f64 {
        let mean = self.cv_mean();
        if self.cv_scores.is_empty() {
            return f64::NAN;
        }
        (self.cv_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>()
            / self.cv_scores.len() as f64)
            .sqrt()
    }
}

/// Chooses and fits a model for one pathway's training data
pub trait ModelOptimizer: Send + Sync {
    fn optimize(
        &self,
        x: ArrayView2<'_, f64>,
        y: &[f64],
        pathway: &str,
    ) -> Result<OptimizedModel, FitError>;
}

/// Randomized search over fixed per-family grids
#[derive(Debug, Clone)]
pub struct RandomizedSearchOptimizer {
    pub model_types: Vec<ModelKind>,
    pub cv_folds: usize,
    /// Candidates sampled per family; the whole grid when it is smaller
    pub iterations: usize,
    pub seed: u64,
    pub show_progress: bool,
}

impl RandomizedSearchOptimizer {
    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            model_types: config.model_types.clone(),
            cv_folds: config.cv_folds,
            iterations: config.search_iterations,
            seed: config.random_seed,
            show_progress: false,
        }
    }

    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// The full candidate grid for a family
    #[must_use]
    pub fn grid(kind: ModelKind) -> Vec<Hyperparameters> {
        match kind {
            ModelKind::RandomForest => iproduct!(
                [50, 100, 200],
                [Some(4), Some(6), Some(10), Some(16)],
                [2, 5, 10],
                [1, 2, 4],
                [1.0, 0.5, 0.33]
            )
            .map(|(n_estimators, max_depth, min_samples_split, min_samples_leaf, max_features)| {
                Hyperparameters::RandomForest(ForestParams {
                    n_estimators,
                    max_depth,
                    min_samples_split,
                    min_samples_leaf,
                    max_features,
                    bootstrap: true,
                })
            })
            .collect(),
            ModelKind::GradientBoosting => iproduct!(
                [50, 100, 200],
                [0.05, 0.1, 0.2],
                [2, 3, 4],
                [1, 2, 4],
                [0.8, 1.0]
            )
            .map(|(n_estimators, learning_rate, max_depth, min_samples_leaf, subsample)| {
                Hyperparameters::GradientBoosting(BoostingParams {
                    n_estimators,
                    learning_rate,
                    max_depth,
                    min_samples_leaf,
                    subsample,
                })
            })
            .collect(),
            ModelKind::ElasticNet => iproduct!([0.001, 0.01, 0.1, 1.0], [0.1, 0.5, 0.9])
                .map(|(alpha, l1_ratio)| {
                    Hyperparameters::ElasticNet(ElasticNetParams {
                        alpha,
                        l1_ratio,
                        ..ElasticNetParams::default()
                    })
                })
                .collect(),
        }
    }

    fn sample_candidates(&self, kind: ModelKind, rng: &mut StdRng) -> Vec<Hyperparameters> {
        let grid = Self::grid(kind);
        if grid.len() <= self.iterations {
            return grid;
        }
        index::sample(rng, grid.len(), self.iterations)
            .into_iter()
            .map(|i| grid[i])
            .collect()
    }

    fn cross_validate(
        &self,
        params: &Hyperparameters,
        x: ArrayView2<'_, f64>,
        y: &[f64],
        folds: &[super::TrainTestSplit],
    ) -> Result<Vec<f64>, FitError> {
        folds
            .iter()
            .map(|fold| {
                let x_train = x.select(Axis(0), &fold.train);
                let y_train: Vec<f64> = fold.train.iter().map(|&i| y[i]).collect();
                let x_val = x.select(Axis(0), &fold.test);
                let y_val: Vec<f64> = fold.test.iter().map(|&i| y[i]).collect();

                let model = params.fit(x_train.view(), &y_train, self.seed)?;
                let predicted = model.predict(x_val.view());
                Ok(r2_score(&y_val, &predicted.to_vec()))
            })
            .collect()
    }
}

impl ModelOptimizer for RandomizedSearchOptimizer {
    fn optimize(
        &self,
        x: ArrayView2<'_, f64>,
        y: &[f64],
        pathway: &str,
    ) -> Result<OptimizedModel, FitError> {
        super::validate_training_data(x, y)?;
        if self.model_types.is_empty() {
            return Err(FitError::NoCandidate("no model types configured".into()));
        }

        let folds = KFold::new(self.cv_folds, self.seed).split(x.nrows())?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let candidates: Vec<Hyperparameters> = self
            .model_types
            .iter()
            .flat_map(|kind| self.sample_candidates(*kind, &mut rng))
            .collect();

        let pb = self.show_progress.then(|| {
            create_search_progress_bar(candidates.len(), Some(&format!("{pathway} model search")))
        });

        let mut best: Option<(Hyperparameters, Vec<f64>, f64)> = None;
        let mut last_error = None;
        for params in candidates {
            match self.cross_validate(&params, x, y, &folds) {
                Ok(scores) => {
                    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
                    log::debug!("[{pathway}] {} candidate CV R² = {mean:.4}", params.kind());
                    if mean.is_finite() && best.as_ref().is_none_or(|(_, _, b)| mean > *b) {
                        best = Some((params, scores, mean));
                    }
                }
                Err(e) => {
                    log::warn!("[{pathway}] {} candidate failed: {e}", params.kind());
                    last_error = Some(e);
                }
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        let Some((params, cv_scores, mean)) = best else {
            let reason = last_error.map_or_else(|| "no finite CV score".to_string(), |e| e.to_string());
            return Err(FitError::NoCandidate(reason));
        };

        if let Some(pb) = &pb {
            finish_progress_bar(pb, Some(&format!("{} selected", params.kind())));
        }
        log::info!(
            "[{pathway}] Selected {} with CV R² = {mean:.4}",
            params.kind()
        );

        let model = params.fit(x, y, self.seed)?;
        Ok(OptimizedModel {
            model,
            params,
            cv_scores,
        })
    }
}
