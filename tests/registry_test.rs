mod utils;

use std::io::Write;

use heat_xai::{AnalysisError, ConfigRegistry, PathwayConfig, PredictorOptions, Result};

/// No pathway ever sees its own target or an excluded biomarker
#[test]
fn test_predictors_never_leak_for_default_pathways() -> Result<()> {
    let registry = ConfigRegistry::heat_health_defaults();
    for pathway in registry.pathway_names() {
        let config = registry.pathway(pathway)?;
        let predictors = registry.pathway_predictors(pathway, PredictorOptions::default())?;
        let blocked = config.blocked_columns();
        for name in predictors.iter().chain(registry.interaction_features(pathway)?.iter()) {
            assert!(
                !blocked.contains(name.as_str()),
                "{pathway} predictors contain blocked column {name}"
            );
        }
        println!("{pathway}: {} predictors", predictors.len());
    }
    Ok(())
}

/// Pathway A excludes pathway B's target, so B's target is never offered to A
#[test]
fn test_exclusion_of_other_pathway_target() -> Result<()> {
    let mut registry = ConfigRegistry::heat_health_defaults();
    registry.pathways = vec![
        PathwayConfig::new("a", "a_marker").with_exclusions(["b_marker"]),
        PathwayConfig::new("b", "b_marker"),
        PathwayConfig::new("c", "c_marker"),
    ];
    registry.validate()?;

    let predictors = registry.pathway_predictors("a", PredictorOptions::default())?;
    assert!(!predictors.contains(&"b_marker".to_string()));
    assert!(!predictors.contains(&"a_marker".to_string()));
    assert!(predictors.contains(&"c_marker".to_string()));

    let for_b = registry.pathway_predictors("b", PredictorOptions::default())?;
    assert!(for_b.contains(&"a_marker".to_string()));
    Ok(())
}

/// Turning off every family leaves nothing
#[test]
fn test_predictor_families_can_be_disabled() -> Result<()> {
    let registry = ConfigRegistry::default();
    let options = PredictorOptions {
        include_climate: false,
        include_demographics: false,
        include_other_health: false,
    };
    assert!(registry.pathway_predictors("metabolic", options)?.is_empty());

    let climate_only = registry.pathway_predictors(
        "metabolic",
        PredictorOptions {
            include_climate: true,
            ..options
        },
    )?;
    assert!(climate_only.iter().all(|name| name.starts_with("climate_")));
    assert_eq!(climate_only.len(), registry.all_climate_features().count());
    Ok(())
}

#[test]
fn test_unknown_pathway() {
    let registry = ConfigRegistry::default();
    let err = registry.interaction_features("hepatic").unwrap_err();
    assert!(matches!(err, AnalysisError::ConfigNotFound { ref pathway } if pathway == "hepatic"));
}

/// A registry file on disk replaces the pathways and keeps the climate vocabulary
#[test]
fn test_registry_from_yaml_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        r"pathways:
  - name: hepatic
    target: hepatic_alt
    transform: log
    exclusions: [hepatic_ast, hepatic_ggt]
    thresholds:
      high: 56.0
"
    )?;

    let registry = ConfigRegistry::from_path(file.path())?;
    assert_eq!(registry.pathway_names().collect::<Vec<_>>(), vec!["hepatic"]);
    assert_eq!(registry.health_prefixes(), vec!["hepatic_".to_string()]);

    let hepatic = registry.pathway("hepatic")?;
    assert_eq!(hepatic.threshold_band(60.0), Some("high"));
    assert_eq!(hepatic.threshold_band(10.0), None);
    assert!(registry.climate_group("temperature").is_some());
    Ok(())
}

/// Registries missing a required climate group are rejected
#[test]
fn test_registry_requires_temperature_group() {
    let yaml = r"
climate_features:
  - name: humidity
    features: [climate_mean_humidity]
";
    let err = ConfigRegistry::from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfig(_)));
}
