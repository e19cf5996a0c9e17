//! Cross-pathway comparison, read-only over recorded outcomes

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::result::{AnalysisResults, PathwayOutcome};

/// Attribution features compared per pathway
pub const COMPARISON_TOP_K: usize = 5;

/// One row of the performance comparison table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub pathway: String,
    pub status: String,
    pub model: Option<String>,
    pub test_r2: Option<f64>,
    pub test_rmse: Option<f64>,
    pub cv_r2_mean: Option<f64>,
    pub n_features: Option<u64>,
    pub n_samples: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathwayComparison {
    pub performance: Vec<PerformanceRow>,
    /// Top attribution features per explained pathway
    pub top_features: BTreeMap<String, Vec<String>>,
    /// Feature → pathways, for features in at least two pathways' top lists
    pub common_predictors: BTreeMap<String, Vec<String>>,
    /// Pathway → top features that appear in no other pathway's list
    pub pathway_specific: BTreeMap<String, Vec<String>>,
}

fn performance_row(pathway: &str, outcome: &PathwayOutcome) -> PerformanceRow {
    let mut row = PerformanceRow {
        pathway: pathway.to_string(),
        status: outcome.status().to_string(),
        model: None,
        test_r2: None,
        test_rmse: None,
        cv_r2_mean: None,
        n_features: None,
        n_samples: 0,
    };
    match outcome {
        PathwayOutcome::Completed(result) => {
            row.model = Some(result.model_kind.to_string());
            row.test_r2 = Some(result.metrics.test_r2);
            row.test_rmse = Some(result.metrics.test_rmse);
            row.cv_r2_mean = Some(result.metrics.cv_r2_mean);
            row.n_features = Some(result.metrics.n_features as u64);
            row.n_samples = result.metrics.n_samples as u64;
        }
        PathwayOutcome::SkippedInsufficientData { available, .. } => {
            row.n_samples = *available as u64;
        }
        PathwayOutcome::Failed { provenance, .. } => {
            row.n_samples = provenance.as_ref().map_or(0, |p| p.n_clean as u64);
        }
    }
    row
}

/// Aggregate recorded outcomes into a comparison
#[must_use]
pub fn compare_pathways(results: &AnalysisResults) -> PathwayComparison {
    let performance = results
        .pathways
        .iter()
        .map(|(pathway, outcome)| performance_row(pathway, outcome))
        .collect();

    let top_features: BTreeMap<String, Vec<String>> = results
        .completed()
        .filter(|r| r.explanation.explanation().is_some())
        .map(|r| {
            let top = r.top_attributed(COMPARISON_TOP_K).into_iter().map(String::from).collect();
            (r.pathway.clone(), top)
        })
        .collect();

    let mut by_feature: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (pathway, features) in &top_features {
        for feature in features {
            by_feature.entry(feature.clone()).or_default().push(pathway.clone());
        }
    }

    let pathway_specific = top_features
        .iter()
        .map(|(pathway, features)| {
            let specific = features
                .iter()
                .filter(|f| by_feature.get(*f).is_some_and(|p| p.len() == 1))
                .cloned()
                .collect();
            (pathway.clone(), specific)
        })
        .collect();

    let common_predictors = by_feature
        .into_iter()
        .filter(|(_, pathways)| pathways.len() >= 2)
        .collect();

    PathwayComparison {
        performance,
        top_features,
        common_predictors,
        pathway_specific,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::{DataProvenance, Stage};
    use crate::config::Transform;
    use crate::error::AnalysisError;
    use crate::targets::TargetProvenance;

    #[test]
    fn test_rows_for_every_outcome() {
        let provenance = TargetProvenance {
            pathway: "renal".to_string(),
            original_column: "renal_creatinine".to_string(),
            transform: Transform::None,
            n_valid: 49,
            missing_pct: 2.0,
            raw_missing: 1,
            n_non_finite: 0,
            params: None,
            threshold_bands: BTreeMap::new(),
        };
        let mut results = AnalysisResults::default();
        results.pathways.insert(
            "renal".to_string(),
            PathwayOutcome::SkippedInsufficientData {
                available: 49,
                required: 50,
                provenance: DataProvenance::new(50, 49, provenance.clone()),
            },
        );
        results.pathways.insert(
            "metabolic".to_string(),
            PathwayOutcome::Failed {
                stage: Stage::Target,
                error: AnalysisError::missing_column("metabolic_glucose"),
                provenance: None,
                selection: None,
            },
        );
        results.pathways.insert(
            "cardiovascular".to_string(),
            PathwayOutcome::Failed {
                stage: Stage::Fit,
                error: AnalysisError::FitFailure {
                    pathway: "cardiovascular".to_string(),
                    reason: "no candidate".to_string(),
                },
                provenance: Some(DataProvenance::new(160, 150, provenance)),
                selection: None,
            },
        );

        let comparison = compare_pathways(&results);
        assert_eq!(comparison.performance.len(), 3);
        let [cardiovascular, metabolic, renal] = &comparison.performance[..] else {
            panic!("expected three rows");
        };
        assert_eq!(cardiovascular.status, "failed");
        assert_eq!(cardiovascular.n_samples, 150);
        assert_eq!(metabolic.pathway, "metabolic");
        assert_eq!(metabolic.status, "failed");
        assert_eq!(metabolic.n_samples, 0);
        assert_eq!(renal.n_samples, 49);
        assert!(comparison.top_features.is_empty());
        assert!(comparison.common_predictors.is_empty());
    }
}
