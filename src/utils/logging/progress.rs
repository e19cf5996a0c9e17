//! Progress reporting for the pathway loop and model search
//!
//! Bars are drawn to stderr and hidden automatically when stderr is not a
//! terminal, so library callers and tests see no output.

use indicatif::{ProgressBar, ProgressStyle};

/// Style for the per-run pathway bar
pub const PATHWAY_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} pathways {msg}";

/// Style for a model-search bar
pub const SEARCH_TEMPLATE: &str =
    "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

fn styled_bar(length: u64, template: &str, description: Option<&str>) -> ProgressBar {
    let pb = ProgressBar::new(length);
    let style = ProgressStyle::default_bar()
        .template(template)
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);

    if let Some(desc) = description {
        pb.set_message(desc.to_string());
    }

    pb
}

/// Create the main progress bar for iterating over pathways
#[must_use]
pub fn create_pathway_progress_bar(pathways: usize, description: Option<&str>) -> ProgressBar {
    styled_bar(pathways as u64, PATHWAY_TEMPLATE, description)
}

/// Create a progress bar for hyperparameter candidates
#[must_use]
pub fn create_search_progress_bar(candidates: usize, description: Option<&str>) -> ProgressBar {
    styled_bar(candidates as u64, SEARCH_TEMPLATE, description)
}

/// Finish a progress bar with an optional completion message
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    if let Some(msg) = message {
        pb.finish_with_message(msg.to_string());
    } else {
        pb.finish();
    }
}
