//! Error handling for heat-health analyses.
//!
//! Configuration mistakes (`ConfigNotFound`, `MissingColumn`, `InvalidConfig`)
//! are caller-fixable. `InsufficientData` and `ExplainabilityUnavailable` are
//! expected, recoverable outcomes that the orchestrator records rather than
//! propagates. `FitFailure` aborts the remaining stages of a single pathway.

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

pub mod util;

/// Specialized error type for the analysis pipeline
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A pathway name that is not present in the registry
    #[error("Pathway '{pathway}' is not registered")]
    ConfigNotFound { pathway: String },

    /// A column required by a configuration is absent from the feature table
    #[error("Column '{column}' not found in feature table")]
    MissingColumn { column: String },

    /// Too few clean rows to analyze a pathway
    #[error("Pathway '{pathway}' has {available} clean rows, at least {required} required")]
    InsufficientData {
        pathway: String,
        available: usize,
        required: usize,
    },

    /// Predictive performance too low to justify attribution analysis
    #[error(
        "XAI analysis unavailable for '{pathway}' due to low predictive performance (R² = {test_r2:.3}, threshold {threshold})"
    )]
    ExplainabilityUnavailable {
        pathway: String,
        test_r2: f64,
        threshold: f64,
    },

    /// The underlying model fit failed
    #[error("Model fit failed for '{pathway}': {reason}")]
    FitFailure { pathway: String, reason: String },

    /// A target transform produced values outside its domain
    #[error("Transform '{transform}' on '{column}' is invalid: {reason}")]
    InvalidTransform {
        column: String,
        transform: String,
        reason: String,
    },

    /// Configuration values out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Attribution computation failed
    #[error("Attribution analysis failed: {0}")]
    Explain(String),

    /// Error opening or writing a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow compute or CSV error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Conversion between serde types and Arrow batches failed
    #[error("Serialization error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),
}

impl AnalysisError {
    pub(crate) fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub(crate) fn config_not_found(pathway: impl Into<String>) -> Self {
        Self::ConfigNotFound {
            pathway: pathway.into(),
        }
    }
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
