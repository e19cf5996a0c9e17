//! Per-dataset descriptor loaded from `<datasets_dir>/<name>.yaml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::util::safe_read_to_string;
use crate::error::Result;

/// Configuration for a specific dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Table file, absolute or relative to the datasets directory
    pub file_path: PathBuf,
    /// Column used to order observations for lag features
    pub date_column: String,
    #[serde(default)]
    pub id_column: Option<String>,
    #[serde(default = "default_climate_prefix")]
    pub climate_prefix: String,
    #[serde(default = "default_health_prefix")]
    pub health_prefix: String,
    #[serde(default = "default_demographic_prefix")]
    pub demographic_prefix: String,
}

fn default_climate_prefix() -> String {
    crate::table::CLIMATE_PREFIX.to_string()
}

fn default_health_prefix() -> String {
    "biomarker_".to_string()
}

fn default_demographic_prefix() -> String {
    "demo_".to_string()
}

#[derive(Deserialize)]
struct DatasetFile {
    dataset: DatasetConfig,
}

impl DatasetConfig {
    /// Create a descriptor for a table file with default prefixes
    pub fn new(
        name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        date_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            file_path: file_path.into(),
            date_column: date_column.into(),
            id_column: None,
            climate_prefix: default_climate_prefix(),
            health_prefix: default_health_prefix(),
            demographic_prefix: default_demographic_prefix(),
        }
    }

    /// Parse the `dataset:` section of a descriptor file
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: DatasetFile = serde_yaml::from_str(yaml)?;
        Ok(file.dataset)
    }

    /// Load `<datasets_dir>/<dataset_name>.yaml`
    pub fn load(datasets_dir: &Path, dataset_name: &str) -> Result<Self> {
        let path = datasets_dir.join(format!("{dataset_name}.yaml"));
        let yaml = safe_read_to_string(&path, "dataset configuration")?;
        Self::from_yaml_str(&yaml)
    }

    /// Resolve the table path against a base directory
    #[must_use]
    pub fn resolve_path(&self, base_dir: &Path) -> PathBuf {
        if self.file_path.is_absolute() {
            self.file_path.clone()
        } else {
            base_dir.join(&self.file_path)
        }
    }
}
