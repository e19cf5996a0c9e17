//! Run summary in markdown

use std::fmt;

use super::RunReport;
use crate::analysis::{ExplanationStatus, PathwayOutcome};

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

/// Render the executive summary of a run
#[must_use]
pub fn summary_markdown(report: &RunReport<'_>) -> String {
    Summary(report).to_string()
}

struct Summary<'r, 'a>(&'r RunReport<'a>);

fn outcome_note(pathway: &str, outcome: &PathwayOutcome) -> Option<String> {
    match outcome {
        PathwayOutcome::SkippedInsufficientData {
            available, required, ..
        } => Some(format!(
            "- {pathway}: insufficient data ({available} clean rows, {required} required)"
        )),
        PathwayOutcome::Failed {
            stage,
            error,
            provenance,
            ..
        } => Some(match provenance {
            Some(p) => format!(
                "- {pathway}: failed at {stage} after {} clean rows: {error}",
                p.n_clean
            ),
            None => format!("- {pathway}: failed at {stage}: {error}"),
        }),
        PathwayOutcome::Completed(result) => match &result.explanation {
            ExplanationStatus::SkippedLowPerformance { test_r2, .. } => Some(format!(
                "- {pathway}: XAI analysis unavailable due to low predictive performance (R² = {test_r2:.3})"
            )),
            ExplanationStatus::Failed { reason } => {
                Some(format!("- {pathway}: attribution failed: {reason}"))
            }
            _ => None,
        },
    }
}

impl fmt::Display for Summary<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "# Heat-Health Analysis Summary: {}\n", report.analysis_name)?;
        writeln!(f, "- Observations: {}", report.quality.n_rows)?;
        writeln!(
            f,
            "- Columns: {} before feature engineering, {} after",
            report.features.n_columns_before, report.features.n_columns_after
        )?;
        if !report.features.dropped_sparse.is_empty() {
            writeln!(
                f,
                "- Dropped for missingness: {}",
                report.features.dropped_sparse.join(", ")
            )?;
        }
        writeln!(f, "- Random seed: {}\n", report.config.random_seed)?;

        writeln!(f, "## Pathway performance\n")?;
        writeln!(f, "| Pathway | Status | Model | Test R² | RMSE | CV R² | Features | Samples |")?;
        writeln!(f, "|---|---|---|---|---|---|---|---|")?;
        for row in &report.comparison.performance {
            writeln!(
                f,
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                row.pathway,
                row.status,
                row.model.as_deref().unwrap_or("-"),
                fmt_opt(row.test_r2),
                fmt_opt(row.test_rmse),
                fmt_opt(row.cv_r2_mean),
                row.n_features.map_or_else(|| "-".to_string(), |n| n.to_string()),
                row.n_samples
            )?;
        }

        let notes: Vec<String> = report
            .results
            .pathways
            .iter()
            .filter_map(|(pathway, outcome)| outcome_note(pathway, outcome))
            .collect();
        if !notes.is_empty() {
            writeln!(f, "\n## Notes\n")?;
            for note in notes {
                writeln!(f, "{note}")?;
            }
        }

        if !report.comparison.common_predictors.is_empty() {
            writeln!(f, "\n## Predictors shared across pathways\n")?;
            for (feature, pathways) in &report.comparison.common_predictors {
                writeln!(f, "- `{feature}`: {}", pathways.join(", "))?;
            }
        }

        let leading: Vec<(&str, &str)> = report
            .results
            .completed()
            .filter_map(|r| {
                let first = r.explanation.explanation()?.hypotheses.first()?;
                Some((r.pathway.as_str(), first.statement.as_str()))
            })
            .collect();
        if !leading.is_empty() {
            writeln!(f, "\n## Leading hypotheses\n")?;
            for (pathway, statement) in leading {
                writeln!(f, "- **{pathway}**: {statement}")?;
            }
        }
        Ok(())
    }
}
