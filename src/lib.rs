//! Pathway-level heat-health analysis over Arrow feature tables.
//!
//! A run loads one feature table, appends climate, temporal and interaction
//! features, then for each physiological pathway selects leakage-safe
//! predictors, fits a model, optionally explains it with feature
//! attributions and templated hypotheses, and writes the results to a
//! timestamped output directory.

pub mod analysis;
pub mod config;
pub mod error;
pub mod explain;
pub mod features;
pub mod models;
pub mod report;
pub mod table;
pub mod targets;
pub mod utils;

// Core types
pub use analysis::{
    AnalysisResults, PathwayAnalyzer, PathwayComparison, PathwayOutcome, PathwayResult, Stage,
    compare_pathways,
};
pub use config::{
    AnalysisConfig, AnalysisOverrides, ConfigRegistry, DatasetConfig, PathwayConfig,
    PredictorOptions, Transform,
};
pub use error::{AnalysisError, Result};

// Feature engineering and targets
pub use features::{FeatureEngineeringReport, FeatureOptions, FeatureOutcome, engineer_features};
pub use table::{FeatureDomain, load_dataset, load_table, load_table_async};
pub use targets::{PathwayTarget, PathwayTargetCreator, TargetProvenance, create_target};

// Models and explanation
pub use explain::{AttributionAnalyzer, Hypothesis, HypothesisGenerator, PermutationShapExplainer};
pub use models::{FittedModel, Hyperparameters, ModelKind, ModelOptimizer, RandomizedSearchOptimizer};

// Arrow types
pub use arrow::record_batch::RecordBatch;
