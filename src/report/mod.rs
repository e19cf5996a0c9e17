//! Run artifacts: output directory, config snapshot, tables and reports
//!
//! Tabular artifacts go through `serde_arrow` into a `RecordBatch` and are
//! written with the Arrow CSV writer, so every CSV has a typed schema.

pub mod summary;

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::csv::WriterBuilder;
use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use chrono::Local;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::analysis::{AnalysisResults, PathwayComparison, PathwayResult};
use crate::config::{AnalysisConfig, ConfigRegistry};
use crate::error::Result;
use crate::error::util::ensure_directory;
use crate::explain::format_report;
use crate::features::FeatureEngineeringReport;
use crate::table::{DataQualityReport, DescriptiveRow};
use crate::utils::logging::{log_artifact_written, log_operation_complete};

pub use summary::summary_markdown;

/// Everything a run produces, borrowed for writing
pub struct RunReport<'a> {
    pub analysis_name: &'a str,
    pub registry: &'a ConfigRegistry,
    pub config: &'a AnalysisConfig,
    pub results: &'a AnalysisResults,
    pub comparison: &'a PathwayComparison,
    pub features: &'a FeatureEngineeringReport,
    pub descriptive: &'a [DescriptiveRow],
    pub quality: &'a DataQualityReport,
    /// Written as Parquet when present
    pub engineered: Option<&'a RecordBatch>,
}

/// Create `<base>/<analysis_name>_<YYYYmmdd_HHMMSS>`
pub fn create_output_dir(base: &Path, analysis_name: &str) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let dir = base.join(format!("{analysis_name}_{stamp}"));
    ensure_directory(&dir, "analysis output")?;
    log::info!("Output directory: {}", dir.display());
    Ok(dir)
}

/// One metric of a pathway's fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub metric: String,
    pub value: f64,
}

/// One row of a pathway's attribution ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRow {
    pub rank: u64,
    pub feature: String,
    pub domain: String,
    pub importance: f64,
    pub importance_pct: f64,
}

#[derive(Serialize)]
struct ConfigSnapshot<'a> {
    analysis: &'a AnalysisConfig,
    registry: &'a ConfigRegistry,
}

#[derive(Serialize)]
struct ResultsDocument<'a> {
    analysis_name: &'a str,
    generated_at: String,
    config: &'a AnalysisConfig,
    feature_engineering: &'a FeatureEngineeringReport,
    pathways: &'a AnalysisResults,
    comparison: &'a PathwayComparison,
}

/// Convert serializable rows into a record batch
pub fn rows_to_batch<T>(rows: &[T]) -> Result<RecordBatch>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let fields = Vec::<FieldRef>::from_type::<T>(TracingOptions::default())?;
    Ok(serde_arrow::to_record_batch(&fields, &rows)?)
}

/// Write a record batch as CSV with a header row
pub fn write_batch_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    log_artifact_written("csv", path);
    Ok(())
}

/// Serialize rows to a typed CSV file
pub fn write_rows_csv<T>(path: &Path, rows: &[T]) -> Result<()>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    write_batch_csv(path, &rows_to_batch(rows)?)
}

/// Write a record batch as a single Parquet file
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    log_artifact_written("parquet", path);
    Ok(())
}

fn write_text(path: &Path, contents: &str, kind: &str) -> Result<()> {
    fs::write(path, contents)?;
    log_artifact_written(kind, path);
    Ok(())
}

/// Snapshot of the registry and analysis parameters used for a run
pub fn write_config_snapshot(dir: &Path, registry: &ConfigRegistry, config: &AnalysisConfig) -> Result<PathBuf> {
    let path = dir.join("analysis_config.yaml");
    let yaml = serde_yaml::to_string(&ConfigSnapshot {
        analysis: config,
        registry,
    })?;
    write_text(&path, &yaml, "config snapshot")?;
    Ok(path)
}

/// Key/value metric rows for a pathway
#[must_use]
pub fn metric_rows(result: &PathwayResult) -> Vec<MetricRow> {
    let m = &result.metrics;
    [
        ("train_r2", m.train_r2),
        ("test_r2", m.test_r2),
        ("cv_r2_mean", m.cv_r2_mean),
        ("cv_r2_std", m.cv_r2_std),
        ("test_rmse", m.test_rmse),
        ("test_mae", m.test_mae),
        ("n_features", m.n_features as f64),
        ("n_samples", m.n_samples as f64),
        ("n_total", result.provenance.n_total as f64),
        ("missing_target_pct", result.provenance.missing_target_pct),
    ]
    .into_iter()
    .map(|(metric, value)| MetricRow {
        metric: metric.to_string(),
        value,
    })
    .chain(
        result
            .provenance
            .target
            .threshold_bands
            .iter()
            .map(|(band, count)| MetricRow {
                metric: format!("n_target_{band}"),
                value: *count as f64,
            }),
    )
    .collect()
}

/// Attribution ranking rows for a pathway; empty when it was not explained
#[must_use]
pub fn importance_rows(result: &PathwayResult) -> Vec<ImportanceRow> {
    result
        .explanation
        .explanation()
        .map(|e| {
            e.attribution
                .feature_importance
                .iter()
                .enumerate()
                .map(|(i, f)| ImportanceRow {
                    rank: i as u64 + 1,
                    feature: f.feature.clone(),
                    domain: f.domain.to_string(),
                    importance: f.importance,
                    importance_pct: f.importance_pct,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Metrics, importance ranking and hypotheses for one completed pathway
pub fn write_pathway_artifacts(dir: &Path, result: &PathwayResult) -> Result<Vec<PathBuf>> {
    let pathway = &result.pathway;
    let mut written = Vec::new();

    let metrics = dir.join(format!("{pathway}_metrics.csv"));
    write_rows_csv(&metrics, &metric_rows(result))?;
    written.push(metrics);

    if let Some(explanation) = result.explanation.explanation() {
        let importance = dir.join(format!("{pathway}_feature_importance.csv"));
        write_rows_csv(&importance, &importance_rows(result))?;
        written.push(importance);

        let hypotheses = dir.join(format!("{pathway}_hypotheses.md"));
        write_text(&hypotheses, &format_report(&explanation.hypotheses, pathway), "hypotheses")?;
        written.push(hypotheses);
    }
    Ok(written)
}

/// Write every artifact of a run into `dir`
pub fn write_report(dir: &Path, report: &RunReport<'_>) -> Result<Vec<PathBuf>> {
    let mut written = vec![write_config_snapshot(dir, report.registry, report.config)?];

    for result in report.results.completed() {
        written.extend(write_pathway_artifacts(dir, result)?);
    }

    let comparison = dir.join("pathway_comparison.csv");
    write_rows_csv(&comparison, &report.comparison.performance)?;
    written.push(comparison);

    let descriptive = dir.join("descriptive_statistics.csv");
    write_rows_csv(&descriptive, report.descriptive)?;
    written.push(descriptive);

    let quality = dir.join("data_quality.md");
    write_text(&quality, &report.quality.to_markdown(), "data quality")?;
    written.push(quality);

    let summary = dir.join("summary.md");
    write_text(&summary, &summary_markdown(report), "summary")?;
    written.push(summary);

    let results = dir.join("results.json");
    let document = ResultsDocument {
        analysis_name: report.analysis_name,
        generated_at: Local::now().to_rfc3339(),
        config: report.config,
        feature_engineering: report.features,
        pathways: report.results,
        comparison: report.comparison,
    };
    write_text(&results, &serde_json::to_string_pretty(&document)?, "results")?;
    written.push(results);

    if let Some(batch) = report.engineered {
        let features = dir.join("engineered_features.parquet");
        write_parquet(&features, batch)?;
        written.push(features);
    }

    log_operation_complete("Wrote", dir, written.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PerformanceRow;
    use crate::utils::arrow_utils::float_column;

    #[test]
    fn test_output_dir_is_timestamped() {
        let base = tempfile::tempdir().unwrap();
        let dir = create_output_dir(base.path(), "heat_analysis").unwrap();
        let name = dir.file_name().unwrap().to_string_lossy().to_string();
        assert!(dir.is_dir());
        assert!(name.starts_with("heat_analysis_"));
        assert_eq!(name.len(), "heat_analysis_".len() + "YYYYmmdd_HHMMSS".len());
    }

    #[test]
    fn test_rows_to_batch_keeps_nullable_columns() {
        let rows = vec![
            PerformanceRow {
                pathway: "metabolic".to_string(),
                status: "completed".to_string(),
                model: Some("elastic_net".to_string()),
                test_r2: Some(0.4),
                test_rmse: Some(1.2),
                cv_r2_mean: Some(0.35),
                n_features: Some(12),
                n_samples: 120,
            },
            PerformanceRow {
                pathway: "renal".to_string(),
                status: "skipped_insufficient_data".to_string(),
                model: None,
                test_r2: None,
                test_rmse: None,
                cv_r2_mean: None,
                n_features: None,
                n_samples: 49,
            },
        ];
        let batch = rows_to_batch(&rows).unwrap();
        assert_eq!(batch.num_rows(), 2);
        let r2 = float_column(&batch, "test_r2").unwrap();
        assert_eq!(r2[0], 0.4);
        assert!(r2[1].is_nan());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comparison.csv");
        write_batch_csv(&path, &batch).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("pathway,status,model,test_r2"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_empty_rows_write_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        write_rows_csv::<MetricRow>(&path, &[]).unwrap();
        assert!(path.exists());
    }
}
