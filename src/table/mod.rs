//! The in-memory feature table and its column-naming conventions.
//!
//! A feature table is a single Arrow `RecordBatch` with one row per
//! participant visit. Column names are the only way a column's domain is
//! known, so the prefixes, suffixes and infix defined here are shared by
//! the registry, the feature engineers and the orchestrator.

pub mod describe;
pub mod loader;
pub mod quality;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::INTERACTION_INFIX;

pub use describe::{DescriptiveRow, KEY_VARIABLES, descriptive_statistics};
pub use loader::{load_dataset, load_table, load_table_async};
pub use quality::{DataQualityReport, PathwayCompleteness, assess_quality};

/// Prefix marking climate exposure columns
pub const CLIMATE_PREFIX: &str = "climate_";

/// Prefixes marking demographic and anthropometric columns
pub const DEMOGRAPHIC_PREFIXES: &[&str] = &["demographic_", "anthropometric_"];

/// Marker preceding the lag period in a lag feature name
pub const LAG_MARKER: &str = "_lag";

/// Marker preceding the window in a rolling feature name
pub const ROLLING_MARKER: &str = "_rolling";

/// Name of a lag feature, `{column}_lag{lag}d`
#[must_use]
pub fn lag_feature_name(column: &str, lag: usize) -> String {
    format!("{column}{LAG_MARKER}{lag}d")
}

/// Name of a rolling-mean feature, `{column}_rolling{window}d`
#[must_use]
pub fn rolling_feature_name(column: &str, window: usize) -> String {
    format!("{column}{ROLLING_MARKER}{window}d")
}

/// Lag period encoded in a `_lag{N}d` feature name
#[must_use]
pub fn parse_lag_days(name: &str) -> Option<usize> {
    let (_, rest) = name.rsplit_once(LAG_MARKER)?;
    let digits = rest.strip_suffix('d')?;
    digits.parse().ok()
}

/// Domain of a feature column, derived from its name alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureDomain {
    Climate,
    Temporal,
    Interaction,
    Demographic,
    Health,
    Other,
}

impl FeatureDomain {
    /// Categorize a column name
    ///
    /// `health_prefixes` are the pathway prefixes (`metabolic_`, ...). Climate
    /// columns with a lag or rolling marker are temporal; any climate or
    /// demographic column containing the interaction infix is an interaction.
    #[must_use]
    pub fn categorize(name: &str, health_prefixes: &[String]) -> Self {
        let is_interaction = name.contains(INTERACTION_INFIX);
        if name.contains(CLIMATE_PREFIX) {
            if name.contains(LAG_MARKER) || name.contains(ROLLING_MARKER) {
                Self::Temporal
            } else if is_interaction {
                Self::Interaction
            } else {
                Self::Climate
            }
        } else if DEMOGRAPHIC_PREFIXES.iter().any(|p| name.contains(p)) {
            if is_interaction {
                Self::Interaction
            } else {
                Self::Demographic
            }
        } else if health_prefixes.iter().any(|p| name.contains(p.as_str())) {
            Self::Health
        } else {
            Self::Other
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Climate => "climate",
            Self::Temporal => "temporal",
            Self::Interaction => "interaction",
            Self::Demographic => "demographic",
            Self::Health => "health",
            Self::Other => "other",
        }
    }

    /// Whether the feature carries climate signal (raw, lagged or interacted)
    #[must_use]
    pub const fn is_climate_related(self) -> bool {
        matches!(self, Self::Climate | Self::Temporal | Self::Interaction)
    }
}

impl fmt::Display for FeatureDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature → domain mapping for a list of predictor names
#[must_use]
pub fn categorize_features(names: &[String], health_prefixes: &[String]) -> BTreeMap<String, FeatureDomain> {
    names
        .iter()
        .map(|name| (name.clone(), FeatureDomain::categorize(name, health_prefixes)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> Vec<String> {
        vec!["metabolic_".to_string(), "renal_".to_string()]
    }

    #[test]
    fn test_categorize_by_naming_convention() {
        let p = prefixes();
        assert_eq!(FeatureDomain::categorize("climate_heat_index", &p), FeatureDomain::Climate);
        assert_eq!(
            FeatureDomain::categorize("climate_heat_index_lag7d", &p),
            FeatureDomain::Temporal
        );
        assert_eq!(
            FeatureDomain::categorize("climate_mean_temperature_rolling3d", &p),
            FeatureDomain::Temporal
        );
        assert_eq!(
            FeatureDomain::categorize("climate_wbgt_x_demographic_bmi", &p),
            FeatureDomain::Interaction
        );
        assert_eq!(
            FeatureDomain::categorize("anthropometric_weight", &p),
            FeatureDomain::Demographic
        );
        assert_eq!(FeatureDomain::categorize("renal_creatinine", &p), FeatureDomain::Health);
        assert_eq!(FeatureDomain::categorize("visit_date", &p), FeatureDomain::Other);
    }

    #[test]
    fn test_parse_lag_days() {
        assert_eq!(parse_lag_days("climate_heat_index_lag21d"), Some(21));
        assert_eq!(parse_lag_days(&lag_feature_name("climate_wbgt", 7)), Some(7));
        assert_eq!(parse_lag_days("climate_heat_index_rolling3d"), None);
        assert_eq!(parse_lag_days("climate_lagoon_depth"), None);
    }
}
