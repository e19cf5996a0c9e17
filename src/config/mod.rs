//! Configuration for heat-health analyses.
//!
//! - [`ConfigRegistry`]: pathway policies and feature vocabularies
//! - [`AnalysisConfig`]: run-wide numeric parameters
//! - [`DatasetConfig`]: per-dataset file and column conventions

pub mod analysis;
pub mod dataset;
pub mod pathway;
pub mod registry;

pub use analysis::{AnalysisConfig, AnalysisOverrides};
pub use dataset::DatasetConfig;
pub use pathway::{PathwayConfig, Transform};
pub use registry::{
    ConfigRegistry, FeatureGroup, HEAT_INDEX_GROUP, INTERACTION_INFIX, InteractionSpec,
    PredictorOptions, TEMPERATURE_GROUP,
};
