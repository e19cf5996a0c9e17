//! Utilities for working with Arrow record batches.
//!
//! The feature table is a single `RecordBatch`. Numeric work happens on
//! `Vec<f64>` columns where Arrow nulls become `NaN`; derived columns are
//! written back as nullable `Float64` arrays with `NaN` mapped to null.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Field, Float64Type, Int64Type, Schema, TimeUnit,
};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};

use crate::error::{AnalysisError, Result};

/// Date formats tried, in order, when a date column is stored as text
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", // ISO format: 2023-01-15
    "%d-%m-%Y", // European: 15-01-2023
    "%m/%d/%Y", // US: 01/15/2023
    "%d/%m/%Y", // UK: 15/01/2023
    "%d.%m.%Y", // Danish: 15.01.2023
    "%Y%m%d",   // Compact: 20230115
];

/// Get the column index by name
///
/// # Errors
/// Returns `MissingColumn` if the column does not exist
pub fn column_index(batch: &RecordBatch, column_name: &str) -> Result<usize> {
    batch
        .schema()
        .index_of(column_name)
        .map_err(|_| AnalysisError::missing_column(column_name))
}

/// Whether the batch has a column with this exact name
#[must_use]
pub fn has_column(batch: &RecordBatch, column_name: &str) -> bool {
    batch.schema().index_of(column_name).is_ok()
}

/// All column names in schema order
#[must_use]
pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

/// Extract a column as `f64` values with nulls mapped to `NaN`
///
/// Integer, boolean and numeric-string columns are cast to `Float64`;
/// unparseable strings become missing.
pub fn float_column(batch: &RecordBatch, column_name: &str) -> Result<Vec<f64>> {
    let idx = column_index(batch, column_name)?;
    array_to_f64(batch.column(idx))
}

/// Convert any castable array to `f64` values with nulls mapped to `NaN`
pub fn array_to_f64(array: &ArrayRef) -> Result<Vec<f64>> {
    let floats = if array.data_type() == &DataType::Float64 {
        array.clone()
    } else {
        cast(array, &DataType::Float64)?
    };
    let floats = floats.as_primitive::<Float64Type>();
    Ok(floats.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Build a nullable `Float64` array, mapping `NaN` to null
#[must_use]
pub fn float_array(values: &[f64]) -> ArrayRef {
    Arc::new(Float64Array::from_iter(
        values.iter().map(|v| if v.is_nan() { None } else { Some(*v) }),
    ))
}

/// Append derived `f64` columns to a batch
///
/// A column whose name already exists is replaced in place, so re-running a
/// feature engineer on its own output does not duplicate columns.
pub fn with_float_columns(
    batch: &RecordBatch,
    columns: Vec<(String, Vec<f64>)>,
) -> Result<RecordBatch> {
    if columns.is_empty() {
        return Ok(batch.clone());
    }

    let schema = batch.schema();
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut arrays: Vec<ArrayRef> = batch.columns().to_vec();

    for (name, values) in columns {
        if values.len() != batch.num_rows() {
            return Err(AnalysisError::InvalidConfig(format!(
                "Derived column '{name}' has {} values, table has {} rows",
                values.len(),
                batch.num_rows()
            )));
        }
        let array = float_array(&values);
        let field = Field::new(&name, DataType::Float64, true);
        match fields.iter().position(|f| f.name() == &name) {
            Some(pos) => {
                fields[pos] = field;
                arrays[pos] = array;
            }
            None => {
                fields.push(field);
                arrays.push(array);
            }
        }
    }

    let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Remove the named columns, ignoring names that are not present
pub fn drop_columns(batch: &RecordBatch, names: &[String]) -> Result<RecordBatch> {
    let keep: Vec<usize> = batch
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !names.contains(f.name()))
        .map(|(i, _)| i)
        .collect();
    Ok(batch.project(&keep)?)
}

/// Sortable keys for a date-like column, `None` for missing or unparseable entries
///
/// Supports `Date32`, `Date64`, timestamps, integers and text dates in one of
/// [`DATE_FORMATS`].
pub fn date_sort_keys(batch: &RecordBatch, column_name: &str) -> Result<Vec<Option<i64>>> {
    let idx = column_index(batch, column_name)?;
    let array = batch.column(idx);

    let keys = match array.data_type() {
        DataType::Date32 => array
            .as_primitive::<Date32Type>()
            .iter()
            .map(|v| v.map(i64::from))
            .collect(),
        DataType::Date64 => array.as_primitive::<Date64Type>().iter().collect(),
        DataType::Timestamp(_, _) => {
            let as_ms = cast(array, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
            let ints = cast(&as_ms, &DataType::Int64)?;
            ints.as_primitive::<Int64Type>().iter().collect()
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let text = cast(array, &DataType::Utf8)?;
            text.as_string::<i32>()
                .iter()
                .map(|v| v.and_then(parse_date).map(|d| i64::from(d.num_days_from_ce())))
                .collect()
        }
        dt if dt.is_integer() => {
            let ints = cast(array, &DataType::Int64)?;
            ints.as_primitive::<Int64Type>().iter().collect()
        }
        other => {
            return Err(AnalysisError::InvalidConfig(format!(
                "Date column '{column_name}' has unsupported type {other:?}"
            )));
        }
    };

    Ok(keys)
}

/// Parse a date string using the first matching format
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}
