//! Lag and rolling-window features over climate columns
//!
//! With a date column, rows are put in date order (stable, undated rows
//! last) before shifting and averaging, and results are written back to
//! each row's original position. Without one, the shift is purely
//! positional: correct only if the table is already sorted by time and
//! evenly spaced.

use arrow::record_batch::RecordBatch;

use super::FeatureOutcome;
use crate::config::INTERACTION_INFIX;
use crate::error::Result;
use crate::table::{CLIMATE_PREFIX, LAG_MARKER, ROLLING_MARKER, lag_feature_name, rolling_feature_name};
use crate::utils::arrow_utils::{date_sort_keys, float_column, has_column, with_float_columns};

/// Climate columns eligible as temporal bases
///
/// Already-derived lag, rolling and interaction columns are excluded, so
/// running the engineer on its own output adds nothing new.
#[must_use]
pub fn temporal_base_columns(table: &RecordBatch) -> Vec<String> {
    table
        .schema()
        .fields()
        .iter()
        .filter(|f| f.data_type().is_numeric())
        .map(|f| f.name())
        .filter(|name| name.contains(CLIMATE_PREFIX))
        .filter(|name| {
            !name.contains(LAG_MARKER)
                && !name.contains(ROLLING_MARKER)
                && !name.contains(INTERACTION_INFIX)
        })
        .cloned()
        .collect()
}

/// Row order used for shifting: date order when available, else positional
fn row_order(table: &RecordBatch, date_column: Option<&str>) -> Result<Vec<usize>> {
    let mut order: Vec<usize> = (0..table.num_rows()).collect();
    match date_column {
        Some(column) if has_column(table, column) => {
            let keys = date_sort_keys(table, column)?;
            order.sort_by_key(|&i| (keys[i].is_none(), keys[i]));
        }
        Some(column) => {
            log::warn!(
                "Date column '{column}' not found; temporal features use positional row order"
            );
        }
        None => {
            log::debug!("No date column; temporal features use positional row order");
        }
    }
    Ok(order)
}

/// Value `lag` rows earlier, `NaN` for the first `lag` rows
#[must_use]
pub fn shift(values: &[f64], lag: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i >= lag { values[i - lag] } else { f64::NAN })
        .collect()
}

/// Trailing mean over `window` rows with a minimum of one observation
///
/// Early rows use a shrinking window; missing values are skipped and an
/// all-missing window yields `NaN`.
#[must_use]
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let (sum, n) = values[start..=i]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            if n == 0 { f64::NAN } else { sum / n as f64 }
        })
        .collect()
}

fn in_order(values: &[f64], order: &[usize]) -> Vec<f64> {
    order.iter().map(|&i| values[i]).collect()
}

fn scatter(ordered: &[f64], order: &[usize]) -> Vec<f64> {
    let mut out = vec![f64::NAN; ordered.len()];
    for (pos, &row) in order.iter().enumerate() {
        out[row] = ordered[pos];
    }
    out
}

/// Add `{col}_lag{L}d` and `{col}_rolling{W}d` for every climate column
///
/// A table with no climate columns is returned unchanged with an empty
/// outcome.
pub fn add_temporal_features(
    table: &RecordBatch,
    date_column: Option<&str>,
    lag_periods: &[usize],
    rolling_windows: &[usize],
) -> Result<(RecordBatch, FeatureOutcome)> {
    let bases = temporal_base_columns(table);
    if bases.is_empty() {
        log::info!("No climate features found for temporal processing");
        return Ok((table.clone(), FeatureOutcome::default()));
    }

    let order = row_order(table, date_column)?;
    let mut derived = Vec::with_capacity(bases.len() * (lag_periods.len() + rolling_windows.len()));

    for base in &bases {
        let ordered = in_order(&float_column(table, base)?, &order);
        for &lag in lag_periods {
            derived.push((lag_feature_name(base, lag), scatter(&shift(&ordered, lag), &order)));
        }
        for &window in rolling_windows {
            derived.push((
                rolling_feature_name(base, window),
                scatter(&rolling_mean(&ordered, window), &order),
            ));
        }
    }

    let names: Vec<String> = derived.iter().map(|(name, _)| name.clone()).collect();
    let outcome = FeatureOutcome {
        requested: names.clone(),
        created: names,
        skipped: Vec::new(),
    };
    let table = with_float_columns(table, derived)?;
    log::info!(
        "Created {} temporal features from {} climate columns",
        outcome.created.len(),
        bases.len()
    );
    Ok((table, outcome))
}
