//! Logging utilities
//!
//! Standardized messages for table loading, artifact writing and the
//! per-pathway stage machine, so run logs read the same across modules.

use std::path::Path;
use std::time::Duration;

/// Log an operation start with consistent format
///
/// # Arguments
/// * `operation` - Description of the operation
/// * `path` - Path of the file or directory being operated on
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Log a completed table load with its shape
///
/// # Arguments
/// * `path` - Source file
/// * `rows` - Number of observations loaded
/// * `columns` - Number of columns loaded
/// * `elapsed` - Optional elapsed time
pub fn log_table_loaded(path: &Path, rows: usize, columns: usize, elapsed: Option<Duration>) {
    match elapsed {
        Some(duration) => log::info!(
            "Loaded {rows} rows x {columns} columns from {} in {duration:?}",
            path.display()
        ),
        None => log::info!("Loaded {rows} rows x {columns} columns from {}", path.display()),
    }
}

/// Log a completed bulk operation with the number of items it produced
pub fn log_operation_complete(operation: &str, path: &Path, items: usize) {
    log::info!("{operation} {items} items in {}", path.display());
}

/// Log that a report artifact has been written
pub fn log_artifact_written(kind: &str, path: &Path) {
    log::debug!("Wrote {kind}: {}", path.display());
}

/// Log a pathway-scoped stage transition
pub fn log_pathway_stage(pathway: &str, stage: &str, detail: &str) {
    log::debug!("[{pathway}] {stage}: {detail}");
}
