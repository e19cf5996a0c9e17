//! Per-pathway analysis: orchestration, result records and comparison

pub mod comparison;
pub mod orchestrator;
pub mod result;

pub use comparison::{COMPARISON_TOP_K, PathwayComparison, PerformanceRow, compare_pathways};
pub use orchestrator::{ImputedMatrix, PathwayAnalyzer, PathwayMatrix};
pub use result::{
    AnalysisResults, DataProvenance, Explanation, ExplanationStatus, ModelMetrics,
    PathwayOutcome, PathwayResult, PredictorSelection, Stage,
};
