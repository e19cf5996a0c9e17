//! Configuration registry: pathways, climate feature groups and demographics.
//!
//! The registry is built once, validated, and then shared read-only
//! (typically behind an `Arc`) by everything that needs to know which
//! columns a pathway may use. Declaration order of pathways and climate
//! groups is preserved because predictor lists are built in that order.

use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::config::analysis::AnalysisConfig;
use crate::config::pathway::{PathwayConfig, Transform};
use crate::error::util::safe_read_to_string;
use crate::error::{AnalysisError, Result};

/// Climate group whose members are crossed with every interaction modifier
pub const TEMPERATURE_GROUP: &str = "temperature";

/// Climate group whose members are crossed with the heat-index modifier
pub const HEAT_INDEX_GROUP: &str = "heat_indices";

/// Infix joining the two factors of an interaction column name
pub const INTERACTION_INFIX: &str = "_x_";

/// A named, ordered group of climate columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGroup {
    pub name: String,
    pub features: Vec<String>,
}

impl FeatureGroup {
    pub fn new<I, S>(name: impl Into<String>, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            features: features.into_iter().map(Into::into).collect(),
        }
    }
}

/// A pair of columns whose product forms an interaction feature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InteractionSpec {
    /// Climate factor
    pub climate: String,
    /// Demographic factor
    pub modifier: String,
}

impl InteractionSpec {
    /// Column name of the product, `{climate}_x_{modifier}`
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}{INTERACTION_INFIX}{}", self.climate, self.modifier)
    }
}

/// Which predictor families to include for a pathway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorOptions {
    pub include_climate: bool,
    pub include_demographics: bool,
    pub include_other_health: bool,
}

impl Default for PredictorOptions {
    fn default() -> Self {
        Self {
            include_climate: true,
            include_demographics: true,
            include_other_health: true,
        }
    }
}

/// Read-only mapping of pathway policies and feature vocabularies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigRegistry {
    /// Registered pathways, in declaration order
    pub pathways: Vec<PathwayConfig>,
    /// Climate feature groups, in declaration order
    pub climate_features: Vec<FeatureGroup>,
    /// Demographic and anthropometric features that are safe for every pathway
    pub demographic_features: Vec<String>,
    /// Demographic columns crossed with every temperature feature
    pub interaction_modifiers: Vec<String>,
    /// Demographic column crossed with every heat-index feature
    pub heat_index_modifier: String,
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::heat_health_defaults()
    }
}

impl ConfigRegistry {
    /// The default heat-health registry: four pathways, four climate groups
    #[must_use]
    pub fn heat_health_defaults() -> Self {
        let pathways = vec![
            PathwayConfig::new("inflammatory", "inflammatory_crp")
                .with_transform(Transform::Log)
                .with_exclusions([
                    "inflammatory_wbc",
                    "inflammatory_neutrophils",
                    "inflammatory_lymphocytes",
                    "inflammatory_il6",
                ])
                .with_threshold("high", 5.0)
                .with_threshold("moderate", 3.0),
            PathwayConfig::new("metabolic", "metabolic_glucose")
                .with_exclusions([
                    "metabolic_hba1c",
                    "metabolic_insulin",
                    "metabolic_triglycerides_ratio",
                ])
                .with_threshold("high", 7.0)
                .with_threshold("moderate", 6.1),
            PathwayConfig::new("cardiovascular", "cardiovascular_systolic_bp_average")
                .with_exclusions([
                    "cardiovascular_diastolic_bp_average",
                    "cardiovascular_pulse_pressure",
                    "cardiovascular_mean_arterial_pressure",
                ])
                .with_threshold("high", 140.0)
                .with_threshold("moderate", 130.0),
            PathwayConfig::new("renal", "renal_creatinine")
                .with_exclusions(["renal_egfr", "renal_bun", "renal_uric_acid"])
                .with_threshold("high", 120.0)
                .with_threshold("moderate", 100.0),
        ];

        let climate_features = vec![
            FeatureGroup::new(
                TEMPERATURE_GROUP,
                [
                    "climate_mean_temperature",
                    "climate_max_temperature",
                    "climate_min_temperature",
                ],
            ),
            FeatureGroup::new(
                "humidity",
                ["climate_mean_humidity", "climate_relative_humidity"],
            ),
            FeatureGroup::new(
                HEAT_INDEX_GROUP,
                [
                    "climate_heat_index",
                    "climate_humidex",
                    "climate_apparent_temp",
                    "climate_wbgt",
                ],
            ),
            FeatureGroup::new(
                "derived",
                [
                    "climate_temp_range",
                    "climate_heat_stress_moderate",
                    "climate_heat_stress_severe",
                ],
            ),
        ];

        let demographic_features = [
            "demographic_age",
            "demographic_gender",
            "demographic_bmi",
            "anthropometric_weight",
            "anthropometric_height",
            "anthropometric_waist_circumference",
        ]
        .map(String::from)
        .to_vec();

        Self {
            pathways,
            climate_features,
            demographic_features,
            interaction_modifiers: vec!["demographic_bmi".to_string(), "demographic_age".to_string()],
            heat_index_modifier: "demographic_bmi".to_string(),
        }
    }

    /// Parse a registry from YAML; absent sections keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let registry: Self = serde_yaml::from_str(yaml)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Load a registry from a YAML file
    pub fn from_path(path: &Path) -> Result<Self> {
        let yaml = safe_read_to_string(path, "pathway registry")?;
        Self::from_yaml_str(&yaml)
    }

    /// Serialize the registry back to YAML
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if let Some(dup) = self.pathways.iter().map(|p| p.name.as_str()).duplicates().next() {
            return Err(AnalysisError::InvalidConfig(format!(
                "Pathway '{dup}' is registered more than once"
            )));
        }
        if let Some(empty) = self.pathways.iter().find(|p| p.target.trim().is_empty()) {
            return Err(AnalysisError::InvalidConfig(format!(
                "Pathway '{}' has an empty target column",
                empty.name
            )));
        }
        for required in [TEMPERATURE_GROUP, HEAT_INDEX_GROUP] {
            if self.climate_group(required).is_none() {
                return Err(AnalysisError::InvalidConfig(format!(
                    "Climate feature group '{required}' is required"
                )));
            }
        }
        Ok(())
    }

    /// Look up a pathway's configuration
    ///
    /// # Errors
    /// Returns `ConfigNotFound` if the pathway is not registered
    pub fn pathway(&self, name: &str) -> Result<&PathwayConfig> {
        self.pathways
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| AnalysisError::config_not_found(name))
    }

    /// Registered pathway names in declaration order
    pub fn pathway_names(&self) -> impl Iterator<Item = &str> {
        self.pathways.iter().map(|p| p.name.as_str())
    }

    /// A climate group by name
    #[must_use]
    pub fn climate_group(&self, name: &str) -> Option<&FeatureGroup> {
        self.climate_features.iter().find(|g| g.name == name)
    }

    /// Every climate feature in group-declaration order
    pub fn all_climate_features(&self) -> impl Iterator<Item = &String> {
        self.climate_features.iter().flat_map(|g| g.features.iter())
    }

    /// Safe predictor list for a pathway
    ///
    /// Climate groups come first (group-declaration order), then the
    /// demographic list, then other pathways' targets unless blocked by this
    /// pathway's exclusions or its own target. Duplicates are not removed.
    ///
    /// # Errors
    /// Returns `ConfigNotFound` if the pathway is not registered
    pub fn pathway_predictors(&self, pathway: &str, options: PredictorOptions) -> Result<Vec<String>> {
        let config = self.pathway(pathway)?;
        let mut predictors = Vec::new();

        if options.include_climate {
            predictors.extend(self.all_climate_features().cloned());
        }

        if options.include_demographics {
            predictors.extend(self.demographic_features.iter().cloned());
        }

        if options.include_other_health {
            let blocked = config.blocked_columns();
            predictors.extend(
                self.pathways
                    .iter()
                    .filter(|other| other.name != config.name)
                    .filter(|other| !blocked.contains(other.target.as_str()))
                    .map(|other| other.target.clone()),
            );
        }

        Ok(predictors)
    }

    /// Interaction factor pairs in naming order
    ///
    /// Every temperature feature crossed with each interaction modifier,
    /// then every heat-index feature crossed with the heat-index modifier.
    #[must_use]
    pub fn interaction_specs(&self) -> Vec<InteractionSpec> {
        let temperature = self
            .climate_group(TEMPERATURE_GROUP)
            .map(|g| g.features.as_slice())
            .unwrap_or_default();
        let heat = self
            .climate_group(HEAT_INDEX_GROUP)
            .map(|g| g.features.as_slice())
            .unwrap_or_default();

        let temperature_pairs = temperature
            .iter()
            .cartesian_product(self.interaction_modifiers.iter())
            .map(|(climate, modifier)| InteractionSpec {
                climate: climate.clone(),
                modifier: modifier.clone(),
            });

        let heat_pairs = heat.iter().map(|climate| InteractionSpec {
            climate: climate.clone(),
            modifier: self.heat_index_modifier.clone(),
        });

        temperature_pairs.chain(heat_pairs).collect()
    }

    /// Interaction feature names available to a pathway
    ///
    /// # Errors
    /// Returns `ConfigNotFound` if the pathway is not registered
    pub fn interaction_features(&self, pathway: &str) -> Result<Vec<String>> {
        self.pathway(pathway)?;
        Ok(self.interaction_specs().iter().map(InteractionSpec::name).collect())
    }

    /// Lag and rolling feature names derived from the climate members of `base_features`
    #[must_use]
    pub fn temporal_feature_names(&self, base_features: &[String], analysis: &AnalysisConfig) -> Vec<String> {
        base_features
            .iter()
            .filter(|f| f.contains(crate::table::CLIMATE_PREFIX))
            .flat_map(|feature| {
                let lags = analysis
                    .lag_periods
                    .iter()
                    .map(move |lag| format!("{feature}_lag{lag}d"));
                let windows = analysis
                    .rolling_windows
                    .iter()
                    .map(move |w| format!("{feature}_rolling{w}d"));
                lags.chain(windows)
            })
            .collect()
    }

    /// Column-name prefixes that mark biomarker (health-domain) columns
    #[must_use]
    pub fn health_prefixes(&self) -> Vec<String> {
        self.pathways.iter().map(|p| format!("{}_", p.name)).collect()
    }
}
