//! Per-pathway result records

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::AnalysisError;
use crate::explain::{AttributionResult, Hypothesis};
use crate::models::{FittedModel, Hyperparameters, ModelKind};
use crate::table::FeatureDomain;
use crate::targets::TargetProvenance;

/// Stages of the per-pathway state machine, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Target,
    SelectPredictors,
    BuildMatrix,
    Clean,
    Impute,
    Split,
    Fit,
    Evaluate,
    Explain,
    Record,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::SelectPredictors => "select_predictors",
            Self::BuildMatrix => "build_matrix",
            Self::Clean => "clean",
            Self::Impute => "impute",
            Self::Split => "split",
            Self::Fit => "fit",
            Self::Evaluate => "evaluate",
            Self::Explain => "explain",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested vs. materialized predictor columns for one pathway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PredictorSelection {
    /// Every name asked for, in request order, duplicates included
    pub requested: Vec<String>,
    /// Unique names present in the table, in first-request order
    pub materialized: Vec<String>,
    /// Requested names absent from the table
    pub missing: Vec<String>,
    /// Names requested more than once
    pub duplicates: Vec<String>,
    /// Materialized names with no observed value among the clean rows
    pub dropped_all_missing: Vec<String>,
}

/// Fit and held-out metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelMetrics {
    pub train_r2: f64,
    pub test_r2: f64,
    pub cv_r2_mean: f64,
    pub cv_r2_std: f64,
    pub test_rmse: f64,
    pub test_mae: f64,
    pub n_features: usize,
    pub n_samples: usize,
}

/// Row counts behind a pathway's analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataProvenance {
    pub n_total: usize,
    pub n_clean: usize,
    /// Share of table rows removed by CLEAN
    pub missing_target_pct: f64,
    pub target: TargetProvenance,
}

impl DataProvenance {
    #[must_use]
    pub fn new(n_total: usize, n_clean: usize, target: TargetProvenance) -> Self {
        let missing_target_pct = if n_total == 0 {
            0.0
        } else {
            (n_total - n_clean) as f64 / n_total as f64 * 100.0
        };
        Self {
            n_total,
            n_clean,
            missing_target_pct,
            target,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub attribution: AttributionResult,
    pub hypotheses: Vec<Hypothesis>,
}

/// What happened at the EXPLAIN stage
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExplanationStatus {
    Completed(Box<Explanation>),
    /// Held-out R² did not exceed the threshold
    SkippedLowPerformance { test_r2: f64, threshold: f64 },
    /// Explanations were turned off for the run
    Disabled,
    /// The analyzer failed; the pathway result is still recorded
    Failed { reason: String },
}

impl ExplanationStatus {
    #[must_use]
    pub fn explanation(&self) -> Option<&Explanation> {
        match self {
            Self::Completed(explanation) => Some(explanation.as_ref()),
            _ => None,
        }
    }
}

/// Immutable record of a completed pathway analysis
#[derive(Debug, Clone, Serialize)]
pub struct PathwayResult {
    pub pathway: String,
    #[serde(skip)]
    pub model: FittedModel,
    pub model_kind: ModelKind,
    pub params: Hyperparameters,
    pub metrics: ModelMetrics,
    /// Predictor columns in matrix order
    pub predictors: Vec<String>,
    pub feature_categories: BTreeMap<String, FeatureDomain>,
    pub selection: PredictorSelection,
    pub explanation: ExplanationStatus,
    pub provenance: DataProvenance,
}

impl PathwayResult {
    /// The `n` most important features by mean |attribution|, if explained
    #[must_use]
    pub fn top_attributed(&self, n: usize) -> Vec<&str> {
        self.explanation
            .explanation()
            .map(|e| {
                e.attribution
                    .feature_importance
                    .iter()
                    .take(n)
                    .map(|f| f.feature.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn error_message<S: Serializer>(error: &AnalysisError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Terminal state of one pathway in a run
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PathwayOutcome {
    Completed(Box<PathwayResult>),
    /// Too few clean rows; FIT was never reached
    SkippedInsufficientData {
        available: usize,
        required: usize,
        provenance: DataProvenance,
    },
    /// A stage error ended the pathway; whatever was computed before it is kept
    Failed {
        stage: Stage,
        #[serde(serialize_with = "error_message")]
        error: AnalysisError,
        /// Present once CLEAN has run
        #[serde(skip_serializing_if = "Option::is_none")]
        provenance: Option<DataProvenance>,
        #[serde(skip_serializing_if = "Option::is_none")]
        selection: Option<PredictorSelection>,
    },
}

impl PathwayOutcome {
    #[must_use]
    pub fn result(&self) -> Option<&PathwayResult> {
        match self {
            Self::Completed(result) => Some(result.as_ref()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::SkippedInsufficientData { .. } => "skipped_insufficient_data",
            Self::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Outcomes of a run, keyed by pathway name
#[derive(Debug, Default, Serialize)]
pub struct AnalysisResults {
    pub pathways: BTreeMap<String, PathwayOutcome>,
}

impl AnalysisResults {
    #[must_use]
    pub fn get(&self, pathway: &str) -> Option<&PathwayOutcome> {
        self.pathways.get(pathway)
    }

    /// Completed results in pathway-name order
    pub fn completed(&self) -> impl Iterator<Item = &PathwayResult> {
        self.pathways.values().filter_map(PathwayOutcome::result)
    }

    #[must_use]
    pub fn n_completed(&self) -> usize {
        self.completed().count()
    }
}
