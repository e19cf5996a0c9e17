//! Logging utilities for output and progress tracking

pub mod log;
pub mod progress;

pub use log::{
    log_artifact_written, log_operation_complete, log_operation_start, log_pathway_stage,
    log_table_loaded,
};
pub use progress::{create_pathway_progress_bar, create_search_progress_bar, finish_progress_bar};
