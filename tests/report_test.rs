mod utils;

use std::sync::Arc;

use heat_xai::report::{RunReport, create_output_dir, write_batch_csv, write_report};
use heat_xai::table::{assess_quality, descriptive_statistics};
use heat_xai::utils::arrow_utils::float_column;
use heat_xai::{
    ConfigRegistry, FeatureOptions, PathwayAnalyzer, Result, compare_pathways, engineer_features,
    load_table, load_table_async,
};
use utils::{fast_config, synthetic_cohort};

/// Load a CSV, run every pathway and write the full artifact set
#[tokio::test]
async fn test_run_writes_report() -> Result<()> {
    let workspace = tempfile::tempdir()?;
    let input = workspace.path().join("cohort.csv");
    write_batch_csv(&input, &synthetic_cohort(120, 100, 19))?;

    let table = load_table_async(&input).await?;
    assert_eq!(table.num_rows(), 120);

    let registry = Arc::new(ConfigRegistry::default());
    let config = fast_config();
    let options = FeatureOptions {
        date_column: Some("visit_date".to_string()),
        ..FeatureOptions::default()
    };
    let (features, feature_report) = engineer_features(&table, &registry, &config, &options)?;
    let descriptive = descriptive_statistics(&features)?;
    let quality = assess_quality(&features, &registry)?;

    let analyzer = PathwayAnalyzer::new(Arc::clone(&registry), config.clone());
    let results = analyzer.run(&features, &analyzer.default_pathways())?;
    let comparison = compare_pathways(&results);

    let output_dir = create_output_dir(workspace.path(), "heat_analysis")?;
    let written = write_report(
        &output_dir,
        &RunReport {
            analysis_name: "heat_analysis",
            registry: &registry,
            config: &config,
            results: &results,
            comparison: &comparison,
            features: &feature_report,
            descriptive: &descriptive,
            quality: &quality,
            engineered: Some(&features),
        },
    )?;

    for path in &written {
        assert!(path.exists(), "{} was not written", path.display());
        println!("wrote {}", path.display());
    }
    for name in [
        "analysis_config.yaml",
        "pathway_comparison.csv",
        "descriptive_statistics.csv",
        "data_quality.md",
        "summary.md",
        "results.json",
        "engineered_features.parquet",
        "metabolic_metrics.csv",
    ] {
        assert!(output_dir.join(name).exists(), "missing {name}");
    }
    if results
        .get("metabolic")
        .and_then(|o| o.result())
        .is_some_and(|r| r.explanation.explanation().is_some())
    {
        assert!(output_dir.join("metabolic_feature_importance.csv").exists());
        assert!(output_dir.join("metabolic_hypotheses.md").exists());
    }

    // CRP spans the inflammatory "high" cut point of 5.0
    let inflammatory = std::fs::read_to_string(output_dir.join("inflammatory_metrics.csv"))?;
    assert!(inflammatory.contains("n_target_high"));

    let comparison_table = load_table(&output_dir.join("pathway_comparison.csv"))?;
    assert_eq!(comparison_table.num_rows(), 4);
    let samples = float_column(&comparison_table, "n_samples")?;
    assert!(samples.iter().all(|n| *n > 0.0));

    let engineered = load_table(&output_dir.join("engineered_features.parquet"))?;
    assert_eq!(engineered.num_columns(), features.num_columns());

    let summary = std::fs::read_to_string(output_dir.join("summary.md"))?;
    assert!(summary.contains("# Heat-Health Analysis Summary: heat_analysis"));
    assert!(summary.contains("| metabolic | completed |"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("results.json"))?)?;
    assert_eq!(json["pathways"]["pathways"]["metabolic"]["status"], "completed");
    Ok(())
}
