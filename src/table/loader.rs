//! Loading the feature table from CSV or Parquet
//!
//! Every loader returns a single `RecordBatch`; multi-batch files are
//! concatenated so downstream code sees one contiguous table.

use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::async_reader::ParquetRecordBatchStreamBuilder;

use crate::config::DatasetConfig;
use crate::error::util::safe_open_file;
use crate::error::{AnalysisError, Result};
use crate::utils::arrow_utils::has_column;
use crate::utils::logging::{log_operation_start, log_table_loaded};

/// Records examined when inferring a CSV schema
pub const SCHEMA_INFERENCE_RECORDS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Csv,
    Parquet,
}

fn detect_format(path: &Path) -> Result<TableFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => Ok(TableFormat::Csv),
        Some("parquet") => Ok(TableFormat::Parquet),
        _ => Err(AnalysisError::InvalidConfig(format!(
            "Unsupported table format for {} (expected .csv or .parquet)",
            path.display()
        ))),
    }
}

fn combine(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<RecordBatch> {
    Ok(concat_batches(schema, batches)?)
}

fn read_csv(path: &Path) -> Result<RecordBatch> {
    let mut file = safe_open_file(path, "feature table")?;
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(SCHEMA_INFERENCE_RECORDS))?;
    file.seek(SeekFrom::Start(0))?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .build(file)?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    combine(&schema, &batches)
}

fn read_parquet(path: &Path) -> Result<RecordBatch> {
    let file = safe_open_file(path, "feature table")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    combine(&schema, &batches)
}

/// Load a feature table, dispatching on the file extension
///
/// # Errors
/// Returns an error if the file cannot be opened, has an unsupported
/// extension, or cannot be decoded
pub fn load_table(path: &Path) -> Result<RecordBatch> {
    log_operation_start("Loading feature table from", path);
    let start = Instant::now();

    let batch = match detect_format(path)? {
        TableFormat::Csv => read_csv(path)?,
        TableFormat::Parquet => read_parquet(path)?,
    };

    log_table_loaded(path, batch.num_rows(), batch.num_columns(), Some(start.elapsed()));
    Ok(batch)
}

/// Load a feature table asynchronously
///
/// Parquet is streamed through the async reader; CSV is decoded on the
/// blocking pool.
pub async fn load_table_async(path: &Path) -> Result<RecordBatch> {
    log_operation_start("Loading feature table asynchronously from", path);
    let start = Instant::now();

    let batch = match detect_format(path)? {
        TableFormat::Parquet => {
            let file = tokio::fs::File::open(path).await?;
            let builder = ParquetRecordBatchStreamBuilder::new(file).await?;
            let schema = builder.schema().clone();
            let stream = builder.build()?;
            let batches: Vec<RecordBatch> = stream.try_collect().await?;
            combine(&schema, &batches)?
        }
        TableFormat::Csv => {
            let owned: PathBuf = path.to_path_buf();
            tokio::task::spawn_blocking(move || read_csv(&owned))
                .await
                .map_err(std::io::Error::other)??
        }
    };

    log_table_loaded(path, batch.num_rows(), batch.num_columns(), Some(start.elapsed()));
    Ok(batch)
}

/// Load the table a dataset descriptor points at and check its declared columns
///
/// # Errors
/// Returns `MissingColumn` if the date or identifier column is absent
pub fn load_dataset(dataset: &DatasetConfig, base_dir: &Path) -> Result<RecordBatch> {
    let path = dataset.resolve_path(base_dir);
    let batch = load_table(&path)?;
    validate_dataset_columns(dataset, &batch)?;
    Ok(batch)
}

fn validate_dataset_columns(dataset: &DatasetConfig, batch: &RecordBatch) -> Result<()> {
    let declared = std::iter::once(dataset.date_column.as_str()).chain(dataset.id_column.as_deref());
    for column in declared {
        if !has_column(batch, column) {
            return Err(AnalysisError::missing_column(column));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_csv_infers_numeric_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "visits.csv",
            "visit_date,climate_temp,metabolic_glucose\n2020-01-01,10.5,5.1\n2020-01-02,20.0,\n",
        );
        let batch = load_table(&path).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 3);
        assert!(batch.schema().field_with_name("climate_temp").unwrap().data_type().is_numeric());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_table(Path::new("visits.xlsx")).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_dataset_checks_declared_columns() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "cohort.csv", "visit_date,climate_temp\n2020-01-01,10\n");
        let mut dataset = DatasetConfig::new("cohort", "cohort.csv", "visit_date");
        assert!(load_dataset(&dataset, dir.path()).is_ok());

        dataset.id_column = Some("participant_id".to_string());
        let err = load_dataset(&dataset, dir.path()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn { .. }));
    }

    #[tokio::test]
    async fn test_async_csv_matches_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "a.csv", "climate_temp\n1\n2\n3\n");
        let sync = load_table(&path).unwrap();
        let async_batch = load_table_async(&path).await.unwrap();
        assert_eq!(sync, async_batch);
    }
}
