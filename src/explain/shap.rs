//! Shapley-value attribution by feature permutation sampling
//!
//! For each explained row, features are switched from a baseline (the
//! training-set column means) to the row's values in random order, and each
//! feature is credited with the change in prediction at the moment it is
//! switched. Averaging over permutations estimates Shapley values; every
//! permutation sums to `f(x) − f(baseline)`, so additivity is exact.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{SliceRandom, index};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::models::{FittedModel, Regressor};
use crate::table::FeatureDomain;
use crate::utils::stats::pearson;

/// Features reported in the top-feature summary
pub const TOP_K: usize = 10;

/// Minimum |r| between two features' attributions to report an interaction
pub const INTERACTION_CORRELATION: f64 = 0.3;

/// Strong interactions listed in full
pub const MAX_REPORTED_INTERACTIONS: usize = 10;

/// Everything an analyzer needs to explain one pathway's model
pub struct ExplainRequest<'a> {
    pub pathway: &'a str,
    pub model: &'a FittedModel,
    pub x_train: ArrayView2<'a, f64>,
    pub x_test: ArrayView2<'a, f64>,
    pub y_test: &'a [f64],
    pub feature_names: &'a [String],
    /// Pathway prefixes used to categorize health features
    pub health_prefixes: &'a [String],
}

/// Mean absolute attribution of one feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
    pub importance_pct: f64,
    pub domain: FeatureDomain,
}

/// The highest-ranked features and how they split across domains
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopFeatures {
    pub features: Vec<FeatureImportance>,
    pub categories: BTreeMap<FeatureDomain, Vec<String>>,
    /// Share of the top-k slots held by raw climate features
    pub climate_dominance: f64,
    pub temporal_importance: f64,
    pub interaction_importance: f64,
}

/// Two features whose attributions move together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionInteraction {
    pub feature_1: String,
    pub feature_2: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionSummary {
    pub strong_interactions: Vec<AttributionInteraction>,
    pub n_strong_interactions: usize,
}

/// Attribution values for a sample of rows plus derived rankings
#[derive(Debug, Clone, Serialize)]
pub struct AttributionResult {
    pub feature_names: Vec<String>,
    /// Model output at the baseline
    pub base_value: f64,
    /// One row per explained observation, one column per feature
    #[serde(skip)]
    pub values: Array2<f64>,
    pub n_explained: usize,
    pub sample_predictions: Vec<f64>,
    pub sample_targets: Vec<f64>,
    /// Sorted by descending importance
    pub feature_importance: Vec<FeatureImportance>,
    pub top_features: TopFeatures,
    pub interactions: InteractionSummary,
}

impl AttributionResult {
    /// Importance entry for a feature, if it was explained
    #[must_use]
    pub fn importance_of(&self, feature: &str) -> Option<&FeatureImportance> {
        self.feature_importance.iter().find(|f| f.feature == feature)
    }
}

/// Computes per-feature attributions for a fitted model
pub trait AttributionAnalyzer: Send + Sync {
    fn explain(&self, request: &ExplainRequest<'_>) -> Result<AttributionResult>;
}

/// Permutation-sampling Shapley explainer with a training-mean baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermutationShapExplainer {
    /// Maximum rows explained
    pub sample_size: usize,
    pub permutations: usize,
    pub seed: u64,
}

impl PermutationShapExplainer {
    #[must_use]
    pub const fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            sample_size: config.shap_sample_size,
            permutations: config.shap_permutations,
            seed: config.random_seed,
        }
    }
}

/// Estimate Shapley values for every row of `rows`
///
/// Returns `(f(baseline), values)`. Row `r` uses a generator seeded with
/// `seed + r`, so results do not depend on thread scheduling.
pub fn permutation_shapley<M: Regressor + Sync>(
    model: &M,
    baseline: ArrayView1<'_, f64>,
    rows: ArrayView2<'_, f64>,
    permutations: usize,
    seed: u64,
) -> (f64, Array2<f64>) {
    let n_features = rows.ncols();
    let base_value = model.predict_row(baseline);
    let permutations = permutations.max(1);

    let per_row: Vec<Vec<f64>> = (0..rows.nrows())
        .into_par_iter()
        .map(|r| {
            let x = rows.row(r);
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(r as u64));
            let mut phi = vec![0.0; n_features];
            let mut order: Vec<usize> = (0..n_features).collect();
            let mut z: Array1<f64> = baseline.to_owned();

            for _ in 0..permutations {
                order.shuffle(&mut rng);
                z.assign(&baseline);
                let mut previous = base_value;
                for &j in &order {
                    z[j] = x[j];
                    let current = model.predict_row(z.view());
                    phi[j] += current - previous;
                    previous = current;
                }
            }
            phi.iter_mut().for_each(|v| *v /= permutations as f64);
            phi
        })
        .collect();

    let values = Array2::from_shape_fn((rows.nrows(), n_features), |(i, j)| per_row[i][j]);
    (base_value, values)
}

/// Mean |φ| per feature with percentage shares, sorted descending
#[must_use]
pub fn feature_importance(
    values: ArrayView2<'_, f64>,
    feature_names: &[String],
    health_prefixes: &[String],
) -> Vec<FeatureImportance> {
    let mean_abs: Vec<f64> = values
        .axis_iter(Axis(1))
        .map(|col| {
            if col.is_empty() {
                0.0
            } else {
                col.iter().map(|v| v.abs()).sum::<f64>() / col.len() as f64
            }
        })
        .collect();
    let total: f64 = mean_abs.iter().sum();

    let mut ranked: Vec<FeatureImportance> = feature_names
        .iter()
        .zip(mean_abs)
        .map(|(name, importance)| FeatureImportance {
            feature: name.clone(),
            importance,
            importance_pct: if total > 0.0 { importance / total * 100.0 } else { 0.0 },
            domain: FeatureDomain::categorize(name, health_prefixes),
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

/// Top-k features grouped by domain, with per-domain shares of the k slots
#[must_use]
pub fn top_features(ranked: &[FeatureImportance], top_k: usize) -> TopFeatures {
    let features: Vec<FeatureImportance> = ranked.iter().take(top_k).cloned().collect();
    let mut categories: BTreeMap<FeatureDomain, Vec<String>> = BTreeMap::new();
    for f in &features {
        categories.entry(f.domain).or_default().push(f.feature.clone());
    }
    let share = |domain: FeatureDomain| {
        categories.get(&domain).map_or(0, Vec::len) as f64 / top_k.max(1) as f64
    };
    TopFeatures {
        climate_dominance: share(FeatureDomain::Climate),
        temporal_importance: share(FeatureDomain::Temporal),
        interaction_importance: share(FeatureDomain::Interaction),
        features,
        categories,
    }
}

/// Feature pairs whose attribution columns correlate above the threshold
#[must_use]
pub fn attribution_interactions(values: ArrayView2<'_, f64>, feature_names: &[String]) -> InteractionSummary {
    let columns: Vec<Vec<f64>> = values.axis_iter(Axis(1)).map(|c| c.to_vec()).collect();
    let mut strong = Vec::new();
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            if let Some(r) = pearson(&columns[i], &columns[j]) {
                if r.abs() > INTERACTION_CORRELATION {
                    strong.push(AttributionInteraction {
                        feature_1: feature_names[i].clone(),
                        feature_2: feature_names[j].clone(),
                        correlation: r,
                    });
                }
            }
        }
    }
    strong.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
    let n_strong_interactions = strong.len();
    strong.truncate(MAX_REPORTED_INTERACTIONS);
    InteractionSummary {
        strong_interactions: strong,
        n_strong_interactions,
    }
}

impl AttributionAnalyzer for PermutationShapExplainer {
    fn explain(&self, request: &ExplainRequest<'_>) -> Result<AttributionResult> {
        let n_test = request.x_test.nrows();
        let n_features = request.x_test.ncols();
        if n_test == 0 || request.x_train.nrows() == 0 {
            return Err(AnalysisError::Explain(format!(
                "no rows to explain for '{}'",
                request.pathway
            )));
        }
        if request.feature_names.len() != n_features || request.x_train.ncols() != n_features {
            return Err(AnalysisError::Explain(format!(
                "feature names ({}) do not match matrix columns ({n_features})",
                request.feature_names.len()
            )));
        }

        let sample: Vec<usize> = if n_test > self.sample_size {
            let mut rng = StdRng::seed_from_u64(self.seed);
            index::sample(&mut rng, n_test, self.sample_size).into_vec()
        } else {
            (0..n_test).collect()
        };
        let x_sample = request.x_test.select(Axis(0), &sample);
        let sample_targets: Vec<f64> = sample.iter().map(|&i| request.y_test[i]).collect();

        let baseline = request
            .x_train
            .mean_axis(Axis(0))
            .ok_or_else(|| AnalysisError::Explain("empty training matrix".into()))?;

        let (base_value, values) = permutation_shapley(
            request.model,
            baseline.view(),
            x_sample.view(),
            self.permutations,
            self.seed,
        );
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::Explain(
                "attribution produced non-finite values".into(),
            ));
        }

        let ranked = feature_importance(values.view(), request.feature_names, request.health_prefixes);
        let top = top_features(&ranked, TOP_K);
        let interactions = attribution_interactions(values.view(), request.feature_names);

        log::info!(
            "[{}] Attribution analysis complete ({} samples, {} strong interactions)",
            request.pathway,
            sample.len(),
            interactions.n_strong_interactions
        );

        Ok(AttributionResult {
            feature_names: request.feature_names.to_vec(),
            base_value,
            n_explained: sample.len(),
            sample_predictions: request.model.predict(x_sample.view()).to_vec(),
            sample_targets,
            values,
            feature_importance: ranked,
            top_features: top,
            interactions,
        })
    }
}
