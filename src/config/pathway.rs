//! Declarative policy for a single physiological pathway.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// How the raw target column is converted before model fitting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// Pass through unchanged
    #[default]
    None,
    /// Median-fill, then `ln(1 + x)`
    Log,
    /// Median-fill, then square root
    Sqrt,
    /// Z-score with the column's own mean and sample standard deviation
    Standardize,
}

impl Transform {
    /// Name used in configuration files and reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Log => "log",
            Self::Sqrt => "sqrt",
            Self::Standardize => "standardize",
        }
    }

    /// Whether missing values are median-filled before the transform
    #[must_use]
    pub const fn fills_missing(self) -> bool {
        matches!(self, Self::Log | Self::Sqrt)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a specific physiological pathway
///
/// `target` is not automatically part of `exclusions`; use
/// [`PathwayConfig::blocked_columns`] when deciding what a pathway may see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayConfig {
    /// Pathway name, e.g. `metabolic`
    pub name: String,
    /// Raw biomarker column this pathway predicts
    pub target: String,
    /// Transform applied to the raw target
    #[serde(default)]
    pub transform: Transform,
    /// Columns that must never be predictors for this pathway
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Named cut points used only for reporting
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
}

impl PathwayConfig {
    /// Create a pathway with no exclusions, thresholds or transform
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            transform: Transform::None,
            exclusions: Vec::new(),
            thresholds: BTreeMap::new(),
        }
    }

    /// Set the target transform
    #[must_use]
    pub const fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the exclusion list
    #[must_use]
    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    /// Add a named reporting threshold
    #[must_use]
    pub fn with_threshold(mut self, name: impl Into<String>, value: f64) -> Self {
        self.thresholds.insert(name.into(), value);
        self
    }

    /// Exclusions plus the pathway's own target
    #[must_use]
    pub fn blocked_columns(&self) -> FxHashSet<&str> {
        self.exclusions
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.target.as_str()))
            .collect()
    }

    /// Name of the highest threshold band the raw value reaches, if any
    #[must_use]
    pub fn threshold_band(&self, value: f64) -> Option<&str> {
        if value.is_nan() {
            return None;
        }
        self.thresholds
            .iter()
            .filter(|(_, cut)| value >= **cut)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cardiovascular() -> PathwayConfig {
        PathwayConfig::new("cardiovascular", "cardiovascular_systolic_bp_average")
            .with_exclusions(["cardiovascular_diastolic_bp_average"])
            .with_threshold("high", 140.0)
            .with_threshold("moderate", 130.0)
    }

    #[test]
    fn test_blocked_columns_include_target() {
        let pathway = cardiovascular();
        let blocked = pathway.blocked_columns();
        assert!(blocked.contains("cardiovascular_systolic_bp_average"));
        assert!(blocked.contains("cardiovascular_diastolic_bp_average"));
        assert_eq!(blocked.len(), 2);
    }

    #[test]
    fn test_threshold_band() {
        let pathway = cardiovascular();
        assert_eq!(pathway.threshold_band(150.0), Some("high"));
        assert_eq!(pathway.threshold_band(135.0), Some("moderate"));
        assert_eq!(pathway.threshold_band(120.0), None);
        assert_eq!(pathway.threshold_band(f64::NAN), None);
    }

    #[test]
    fn test_transform_yaml_names() {
        let parsed: Transform = serde_yaml::from_str("standardize").unwrap();
        assert_eq!(parsed, Transform::Standardize);
        assert_eq!(Transform::Log.to_string(), "log");
        assert!(Transform::Sqrt.fills_missing());
        assert!(!Transform::Standardize.fills_missing());
    }
}
