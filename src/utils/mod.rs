//! Shared utilities: Arrow column helpers, NaN-aware statistics and logging

pub mod arrow_utils;
pub mod logging;
pub mod stats;

pub use arrow_utils::{column_names, float_column, has_column, with_float_columns};
pub use logging::{log_operation_start, log_pathway_stage};
