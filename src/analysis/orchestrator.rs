//! Pathway Analysis Orchestrator
//!
//! Runs every requested pathway through
//! `TARGET → SELECT_PREDICTORS → BUILD_MATRIX → CLEAN → IMPUTE → SPLIT → FIT
//! → EVALUATE → (EXPLAIN) → RECORD`. A stage error ends that pathway only and
//! is recorded as [`PathwayOutcome::Failed`]; the run continues.
//!
//! Predictor imputation uses medians computed over the pathway's own clean
//! rows, so the same column can be filled differently for different
//! pathways.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use ndarray::{Array2, Axis};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use super::result::{
    AnalysisResults, DataProvenance, Explanation, ExplanationStatus, ModelMetrics,
    PathwayOutcome, PathwayResult, PredictorSelection, Stage,
};
use crate::config::{AnalysisConfig, ConfigRegistry, PathwayConfig, PredictorOptions};
use crate::error::{AnalysisError, Result};
use crate::explain::{
    AttributionAnalyzer, ExplainRequest, HypothesisGenerator, PermutationShapExplainer,
};
use crate::models::{
    FitError, ModelOptimizer, OptimizedModel, RandomizedSearchOptimizer, Regressor, mae,
    r2_score, rmse, train_test_split,
};
use crate::table::categorize_features;
use crate::targets::{PathwayTarget, PathwayTargetCreator};
use crate::utils::arrow_utils::{float_column, has_column};
use crate::utils::logging::{create_pathway_progress_bar, finish_progress_bar, log_pathway_stage};
use crate::utils::stats;

/// A stage failure, before it is turned into an outcome
#[derive(Debug)]
struct StageError {
    stage: Stage,
    error: AnalysisError,
    provenance: Option<DataProvenance>,
    selection: Option<PredictorSelection>,
}

impl StageError {
    fn new(stage: Stage, error: AnalysisError) -> Self {
        Self {
            stage,
            error,
            provenance: None,
            selection: None,
        }
    }

    /// Attach what the pathway had computed before failing
    fn with_partial(mut self, provenance: DataProvenance, selection: PredictorSelection) -> Self {
        self.provenance = Some(provenance);
        self.selection = Some(selection);
        self
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError> {
        self.map_err(|error| StageError::new(stage, error))
    }
}

/// Output of the stages between IMPUTE and EXPLAIN
struct FittedPathway {
    optimized: OptimizedModel,
    metrics: ModelMetrics,
    predictors: Vec<String>,
    explanation: ExplanationStatus,
}

fn fit_failure(pathway: &str, error: &FitError) -> AnalysisError {
    AnalysisError::FitFailure {
        pathway: pathway.to_string(),
        reason: error.to_string(),
    }
}

/// Predictor columns and target projected from the feature table
#[derive(Debug, Clone, PartialEq)]
pub struct PathwayMatrix {
    pub feature_names: Vec<String>,
    /// One vector per feature, one value per table row
    pub columns: Vec<Vec<f64>>,
    pub target: Vec<f64>,
}

impl PathwayMatrix {
    /// Project `features` and the target series from `table`
    pub fn build(table: &RecordBatch, features: &[String], target: Vec<f64>) -> Result<Self> {
        if target.len() != table.num_rows() {
            return Err(AnalysisError::InvalidConfig(format!(
                "target has {} values, table has {} rows",
                target.len(),
                table.num_rows()
            )));
        }
        let columns = features
            .iter()
            .map(|name| float_column(table, name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            feature_names: features.to_vec(),
            columns,
            target,
        })
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    /// Keep only rows whose target is finite
    #[must_use]
    pub fn clean(&self) -> Self {
        let rows: Vec<usize> = (0..self.n_rows())
            .filter(|&i| self.target[i].is_finite())
            .collect();
        Self {
            feature_names: self.feature_names.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| rows.iter().map(|&i| col[i]).collect())
                .collect(),
            target: rows.iter().map(|&i| self.target[i]).collect(),
        }
    }

    /// Fill non-finite predictor values with the column median
    ///
    /// Columns with no finite value are dropped and returned by name.
    #[must_use]
    pub fn impute(&self) -> ImputedMatrix {
        let mut feature_names = Vec::with_capacity(self.feature_names.len());
        let mut medians = Vec::with_capacity(self.feature_names.len());
        let mut kept = Vec::with_capacity(self.columns.len());
        let mut dropped = Vec::new();

        for (name, col) in self.feature_names.iter().zip(&self.columns) {
            let finite: Vec<f64> = col.iter().copied().filter(|v| v.is_finite()).collect();
            if finite.is_empty() {
                dropped.push(name.clone());
                continue;
            }
            let median = stats::median(&finite);
            feature_names.push(name.clone());
            medians.push(median);
            kept.push(
                col.iter()
                    .map(|v| if v.is_finite() { *v } else { median })
                    .collect::<Vec<f64>>(),
            );
        }

        let x = Array2::from_shape_fn((self.n_rows(), kept.len()), |(i, j)| kept[j][i]);
        ImputedMatrix {
            feature_names,
            x,
            y: self.target.clone(),
            medians,
            dropped_all_missing: dropped,
        }
    }
}

/// Fully observed design matrix for one pathway
#[derive(Debug, Clone, PartialEq)]
pub struct ImputedMatrix {
    pub feature_names: Vec<String>,
    pub x: Array2<f64>,
    pub y: Vec<f64>,
    /// Fill value used for each kept column
    pub medians: Vec<f64>,
    pub dropped_all_missing: Vec<String>,
}

struct Partition {
    x_train: Array2<f64>,
    y_train: Vec<f64>,
    x_test: Array2<f64>,
    y_test: Vec<f64>,
}

fn partition(m: &ImputedMatrix, train: &[usize], test: &[usize]) -> Partition {
    Partition {
        x_train: m.x.select(Axis(0), train),
        y_train: train.iter().map(|&i| m.y[i]).collect(),
        x_test: m.x.select(Axis(0), test),
        y_test: test.iter().map(|&i| m.y[i]).collect(),
    }
}

fn evaluate(
    model: &OptimizedModel,
    parts: &Partition,
    n_features: usize,
    n_samples: usize,
) -> ModelMetrics {
    let train_pred = model.model.predict(parts.x_train.view()).to_vec();
    let test_pred = model.model.predict(parts.x_test.view()).to_vec();
    ModelMetrics {
        train_r2: r2_score(&parts.y_train, &train_pred),
        test_r2: r2_score(&parts.y_test, &test_pred),
        cv_r2_mean: model.cv_mean(),
        cv_r2_std: model.cv_std(),
        test_rmse: rmse(&parts.y_test, &test_pred),
        test_mae: mae(&parts.y_test, &test_pred),
        n_features,
        n_samples,
    }
}

/// Sequences feature selection, fitting and explanation for each pathway
pub struct PathwayAnalyzer {
    registry: Arc<ConfigRegistry>,
    config: AnalysisConfig,
    optimizer: Box<dyn ModelOptimizer>,
    explainer: Box<dyn AttributionAnalyzer>,
    hypotheses: HypothesisGenerator,
    targets: PathwayTargetCreator,
    explain: bool,
    show_progress: bool,
}

impl PathwayAnalyzer {
    /// Analyzer with the randomized-search optimizer and permutation explainer
    #[must_use]
    pub fn new(registry: Arc<ConfigRegistry>, config: AnalysisConfig) -> Self {
        Self {
            optimizer: Box::new(RandomizedSearchOptimizer::from_config(&config)),
            explainer: Box::new(PermutationShapExplainer::from_config(&config)),
            hypotheses: HypothesisGenerator::default(),
            targets: PathwayTargetCreator::new(config.strict_transforms),
            registry,
            config,
            explain: true,
            show_progress: false,
        }
    }

    #[must_use]
    pub fn with_optimizer(mut self, optimizer: Box<dyn ModelOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    #[must_use]
    pub fn with_explainer(mut self, explainer: Box<dyn AttributionAnalyzer>) -> Self {
        self.explainer = explainer;
        self
    }

    /// Enable or disable the EXPLAIN stage
    #[must_use]
    pub const fn with_explanations(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Resolve a pathway's predictors against the table
    ///
    /// Requests the registry's safe predictors, its interaction features and
    /// any configured extra interaction terms. Lag/rolling features of the
    /// climate columns are requested only with `temporal_predictors` set.
    /// The pathway's target and exclusions are removed again from the
    /// result, whatever their source.
    pub fn select_predictors(&self, table: &RecordBatch, pathway: &str) -> Result<PredictorSelection> {
        let config = self.registry.pathway(pathway)?;
        let mut requested = self.registry.pathway_predictors(pathway, PredictorOptions::default())?;
        if self.config.temporal_predictors {
            let climate: Vec<String> = self.registry.all_climate_features().cloned().collect();
            requested.extend(self.registry.temporal_feature_names(&climate, &self.config));
        }
        requested.extend(self.registry.interaction_features(pathway)?);
        requested.extend(self.config.interaction_terms.iter().cloned());

        let blocked = config.blocked_columns();
        let mut seen = FxHashSet::default();
        let mut selection = PredictorSelection::default();
        for name in &requested {
            if !seen.insert(name.as_str()) {
                if !selection.duplicates.contains(name) {
                    selection.duplicates.push(name.clone());
                }
                continue;
            }
            if blocked.contains(name.as_str()) {
                log::warn!("[{pathway}] Refusing blocked predictor '{name}'");
                continue;
            }
            if has_column(table, name) {
                selection.materialized.push(name.clone());
            } else {
                selection.missing.push(name.clone());
            }
        }
        selection.requested = requested;

        log_pathway_stage(
            pathway,
            Stage::SelectPredictors.as_str(),
            &format!(
                "{} requested, {} available, {} missing, {} duplicates",
                selection.requested.len(),
                selection.materialized.len(),
                selection.missing.len(),
                selection.duplicates.len()
            ),
        );
        Ok(selection)
    }

    /// Run one pathway to a terminal outcome
    ///
    /// Never returns an error: every stage failure becomes
    /// [`PathwayOutcome::Failed`].
    pub fn run_pathway(&self, table: &RecordBatch, pathway: &str) -> PathwayOutcome {
        match self.analyze(table, pathway) {
            Ok(outcome) => outcome,
            Err(StageError {
                stage,
                error,
                provenance,
                selection,
            }) => {
                log::error!("[{pathway}] Failed at {stage}: {error}");
                PathwayOutcome::Failed {
                    stage,
                    error,
                    provenance,
                    selection,
                }
            }
        }
    }

    fn analyze(&self, table: &RecordBatch, pathway: &str) -> std::result::Result<PathwayOutcome, StageError> {
        let config: &PathwayConfig = self.registry.pathway(pathway).at(Stage::Target)?;
        let PathwayTarget { values, provenance } =
            self.targets.create_target(table, config).at(Stage::Target)?;

        let mut selection = self.select_predictors(table, pathway).at(Stage::SelectPredictors)?;

        let matrix = PathwayMatrix::build(table, &selection.materialized, values).at(Stage::BuildMatrix)?;

        let clean = matrix.clean();
        let n_total = matrix.n_rows();
        let n_clean = clean.n_rows();
        let data = DataProvenance::new(n_total, n_clean, provenance);
        if n_clean < self.config.min_samples {
            let error = AnalysisError::InsufficientData {
                pathway: pathway.to_string(),
                available: n_clean,
                required: self.config.min_samples,
            };
            log::warn!("{error}");
            return Ok(PathwayOutcome::SkippedInsufficientData {
                available: n_clean,
                required: self.config.min_samples,
                provenance: data,
            });
        }
        log_pathway_stage(
            pathway,
            Stage::Clean.as_str(),
            &format!("{n_clean} of {n_total} rows, {} features", clean.feature_names.len()),
        );

        let fitted = match self.fit_clean(pathway, &clean, &mut selection) {
            Ok(fitted) => fitted,
            Err(e) => return Err(e.with_partial(data, selection)),
        };

        let feature_categories = categorize_features(&fitted.predictors, &self.registry.health_prefixes());
        Ok(PathwayOutcome::Completed(Box::new(PathwayResult {
            pathway: pathway.to_string(),
            model_kind: fitted.optimized.model.kind(),
            params: fitted.optimized.params,
            model: fitted.optimized.model,
            metrics: fitted.metrics,
            predictors: fitted.predictors,
            feature_categories,
            selection,
            explanation: fitted.explanation,
            provenance: data,
        })))
    }

    /// IMPUTE → SPLIT → FIT → EVALUATE → EXPLAIN over the clean rows
    fn fit_clean(
        &self,
        pathway: &str,
        clean: &PathwayMatrix,
        selection: &mut PredictorSelection,
    ) -> std::result::Result<FittedPathway, StageError> {
        let imputed = clean.impute();
        if !imputed.dropped_all_missing.is_empty() {
            log::warn!(
                "[{pathway}] Dropping {} predictors with no observed values: {}",
                imputed.dropped_all_missing.len(),
                imputed.dropped_all_missing.join(", ")
            );
        }
        selection.dropped_all_missing.clone_from(&imputed.dropped_all_missing);
        if imputed.feature_names.is_empty() {
            return Err(StageError::new(
                Stage::Impute,
                fit_failure(pathway, &FitError::InvalidParameter("no usable predictors".into())),
            ));
        }

        let split = train_test_split(clean.n_rows(), self.config.test_size, self.config.random_seed)
            .map_err(|e| fit_failure(pathway, &e))
            .at(Stage::Split)?;
        let parts = partition(&imputed, &split.train, &split.test);

        let optimized = self
            .optimizer
            .optimize(parts.x_train.view(), &parts.y_train, pathway)
            .map_err(|e| fit_failure(pathway, &e))
            .at(Stage::Fit)?;

        let metrics = evaluate(&optimized, &parts, imputed.feature_names.len(), clean.n_rows());
        log::info!(
            "[{pathway}] {}: test R² = {:.3}, RMSE = {:.3}",
            optimized.model.kind(),
            metrics.test_r2,
            metrics.test_rmse
        );

        let explanation = self.explain_stage(pathway, &optimized, &parts, &imputed.feature_names, metrics.test_r2);
        Ok(FittedPathway {
            optimized,
            metrics,
            predictors: imputed.feature_names,
            explanation,
        })
    }

    fn explain_stage(
        &self,
        pathway: &str,
        optimized: &OptimizedModel,
        parts: &Partition,
        feature_names: &[String],
        test_r2: f64,
    ) -> ExplanationStatus {
        if !self.explain {
            return ExplanationStatus::Disabled;
        }
        let threshold = self.config.min_predictive_threshold;
        let explainable = test_r2 > threshold;
        if !explainable {
            log::warn!(
                "{}",
                AnalysisError::ExplainabilityUnavailable {
                    pathway: pathway.to_string(),
                    test_r2,
                    threshold,
                }
            );
            return ExplanationStatus::SkippedLowPerformance { test_r2, threshold };
        }

        let health_prefixes = self.registry.health_prefixes();
        let request = ExplainRequest {
            pathway,
            model: &optimized.model,
            x_train: parts.x_train.view(),
            x_test: parts.x_test.view(),
            y_test: &parts.y_test,
            feature_names,
            health_prefixes: &health_prefixes,
        };
        match self.explainer.explain(&request) {
            Ok(attribution) => {
                let hypotheses = self.hypotheses.generate(&attribution, pathway);
                ExplanationStatus::Completed(Box::new(Explanation {
                    attribution,
                    hypotheses,
                }))
            }
            Err(e) => {
                log::warn!("[{pathway}] {e}");
                ExplanationStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Analyze each pathway and collect the outcomes
    ///
    /// # Errors
    /// Returns `ConfigNotFound` before any work starts if a pathway is not
    /// registered.
    pub fn run(&self, table: &RecordBatch, pathways: &[String]) -> Result<AnalysisResults> {
        for pathway in pathways {
            self.registry.pathway(pathway)?;
        }

        let pb = self
            .show_progress
            .then(|| create_pathway_progress_bar(pathways.len(), Some("analyzing")));

        let run_one = |pathway: &String| {
            if let Some(pb) = &pb {
                pb.set_message(pathway.clone());
            }
            let outcome = self.run_pathway(table, pathway);
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            (pathway.clone(), outcome)
        };

        let outcomes: BTreeMap<String, PathwayOutcome> = if self.config.parallel_pathways {
            pathways.par_iter().map(run_one).collect()
        } else {
            pathways.iter().map(run_one).collect()
        };

        let results = AnalysisResults { pathways: outcomes };
        if let Some(pb) = &pb {
            let message = format!("{} of {} pathways completed", results.n_completed(), pathways.len());
            finish_progress_bar(pb, Some(&message));
        }
        log::info!(
            "Analysis finished: {} of {} pathways completed",
            results.n_completed(),
            pathways.len()
        );
        Ok(results)
    }

    /// Registered pathway names, for runs that do not name any
    #[must_use]
    pub fn default_pathways(&self) -> Vec<String> {
        self.registry.pathway_names().map(String::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Float64Array;
    use arrow::datatypes::{DataType, Field, Schema};

    fn table(columns: Vec<(&str, Vec<Option<f64>>)>) -> RecordBatch {
        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|(n, _)| Field::new(*n, DataType::Float64, true))
                .collect::<Vec<_>>(),
        ));
        let arrays = columns
            .into_iter()
            .map(|(_, v)| Arc::new(Float64Array::from(v)) as arrow::array::ArrayRef)
            .collect();
        RecordBatch::try_new(schema, arrays).unwrap()
    }

    #[test]
    fn test_clean_drops_missing_targets() {
        let t = table(vec![
            ("climate_temp", vec![Some(10.0), Some(20.0), Some(30.0), Some(15.0), Some(25.0)]),
            ("metabolic_glucose", vec![Some(5.0), Some(6.0), None, Some(7.0), Some(8.0)]),
        ]);
        let target = float_column(&t, "metabolic_glucose").unwrap();
        let matrix = PathwayMatrix::build(&t, &["climate_temp".to_string()], target).unwrap();
        let clean = matrix.clean();
        assert_eq!(clean.n_rows(), 4);
        assert_eq!(clean.target, vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(clean.columns[0], vec![10.0, 20.0, 15.0, 25.0]);
    }

    #[test]
    fn test_impute_uses_local_median_and_drops_empty_columns() {
        let matrix = PathwayMatrix {
            feature_names: vec!["a".into(), "b".into()],
            columns: vec![vec![1.0, f64::NAN, 3.0, 10.0], vec![f64::NAN; 4]],
            target: vec![1.0, 2.0, 3.0, 4.0],
        };
        let imputed = matrix.impute();
        assert_eq!(imputed.feature_names, vec!["a".to_string()]);
        assert_eq!(imputed.dropped_all_missing, vec!["b".to_string()]);
        assert_eq!(imputed.x[[1, 0]], 3.0);
        assert_eq!(imputed.x.dim(), (4, 1));
    }

    #[test]
    fn test_selection_never_contains_blocked_columns() {
        let registry = Arc::new(ConfigRegistry::default());
        let mut config = AnalysisConfig::default();
        config.interaction_terms = vec!["cardiovascular_diastolic_bp_average".to_string()];
        let analyzer = PathwayAnalyzer::new(registry, config);
        let t = table(vec![
            ("climate_max_temperature", vec![Some(1.0)]),
            ("cardiovascular_diastolic_bp_average", vec![Some(1.0)]),
            ("metabolic_glucose", vec![Some(1.0)]),
        ]);
        let selection = analyzer.select_predictors(&t, "cardiovascular").unwrap();
        assert!(!selection.materialized.contains(&"cardiovascular_diastolic_bp_average".to_string()));
        assert!(selection.materialized.contains(&"metabolic_glucose".to_string()));
        assert!(selection.materialized.contains(&"climate_max_temperature".to_string()));
        assert!(!selection.missing.is_empty());
    }

    fn lagged_table() -> RecordBatch {
        table(vec![
            ("climate_mean_temperature", vec![Some(24.0)]),
            ("climate_mean_temperature_lag7d", vec![Some(22.0)]),
            ("climate_mean_temperature_rolling3d", vec![Some(23.0)]),
            ("demographic_bmi", vec![Some(27.0)]),
            ("climate_mean_temperature_x_demographic_bmi", vec![Some(648.0)]),
            ("inflammatory_crp", vec![Some(2.0)]),
        ])
    }

    #[test]
    fn test_default_selection_is_registry_and_interactions() {
        let registry = Arc::new(ConfigRegistry::default());
        let config = AnalysisConfig::default();
        let t = lagged_table();

        let mut expected: Vec<String> = registry
            .pathway_predictors("metabolic", PredictorOptions::default())
            .unwrap();
        expected.extend(registry.interaction_features("metabolic").unwrap());
        expected.extend(config.interaction_terms.iter().cloned());
        let expected: FxHashSet<String> = expected.into_iter().filter(|n| has_column(&t, n)).collect();

        let selection = PathwayAnalyzer::new(registry, config)
            .select_predictors(&t, "metabolic")
            .unwrap();
        let materialized: FxHashSet<String> = selection.materialized.iter().cloned().collect();
        assert_eq!(materialized, expected);
        assert!(materialized.contains("climate_mean_temperature_x_demographic_bmi"));
        assert!(!materialized.contains("climate_mean_temperature_lag7d"));
        assert!(!materialized.contains("climate_mean_temperature_rolling3d"));
        assert!(!selection.requested.iter().any(|n| n.contains("_lag") || n.contains("_rolling")));
    }

    #[test]
    fn test_temporal_predictors_are_opt_in() {
        let config = AnalysisConfig {
            temporal_predictors: true,
            ..AnalysisConfig::default()
        };
        let analyzer = PathwayAnalyzer::new(Arc::new(ConfigRegistry::default()), config);
        let selection = analyzer.select_predictors(&lagged_table(), "metabolic").unwrap();
        assert!(selection.materialized.contains(&"climate_mean_temperature_lag7d".to_string()));
        assert!(selection.materialized.contains(&"climate_mean_temperature_rolling3d".to_string()));
    }

    #[test]
    fn test_unknown_pathway_aborts_run() {
        let analyzer = PathwayAnalyzer::new(Arc::new(ConfigRegistry::default()), AnalysisConfig::default());
        let t = table(vec![("climate_temp", vec![Some(1.0)])]);
        let err = analyzer.run(&t, &["hepatic".to_string()]).unwrap_err();
        assert!(matches!(err, AnalysisError::ConfigNotFound { .. }));
    }
}
