//! Climate × demographic interaction features
//!
//! Names and factor pairs come from [`ConfigRegistry::interaction_specs`],
//! so the columns created here are exactly the ones the registry
//! advertises. Pairs with an absent factor are skipped and reported.

use arrow::record_batch::RecordBatch;

use super::FeatureOutcome;
use crate::config::ConfigRegistry;
use crate::error::Result;
use crate::utils::arrow_utils::{float_column, has_column, with_float_columns};

/// Add the element-wise product for every registry interaction pair
pub fn add_interaction_features(
    table: &RecordBatch,
    registry: &ConfigRegistry,
) -> Result<(RecordBatch, FeatureOutcome)> {
    let mut outcome = FeatureOutcome::default();
    let mut derived = Vec::new();

    for spec in registry.interaction_specs() {
        let name = spec.name();
        outcome.requested.push(name.clone());

        let absent: Vec<&str> = [spec.climate.as_str(), spec.modifier.as_str()]
            .into_iter()
            .filter(|factor| !has_column(table, factor))
            .collect();
        if !absent.is_empty() {
            outcome.skip(&name, &format!("missing factor {}", absent.join(", ")));
            continue;
        }

        let climate = float_column(table, &spec.climate)?;
        let modifier = float_column(table, &spec.modifier)?;
        let product = climate.iter().zip(&modifier).map(|(a, b)| a * b).collect();
        derived.push((name, product));
    }

    outcome.created = derived.iter().map(|(name, _)| name.clone()).collect();
    if !outcome.skipped.is_empty() {
        log::warn!(
            "Skipped {} of {} interaction features with missing factors",
            outcome.skipped.len(),
            outcome.requested.len()
        );
    }
    log::info!("Created {} interaction features", outcome.created.len());

    let table = with_float_columns(table, derived)?;
    Ok((table, outcome))
}
