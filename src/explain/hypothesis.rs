//! Templated research hypotheses from attribution rankings

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use super::shap::{AttributionResult, FeatureImportance};
use crate::config::INTERACTION_INFIX;
use crate::table::{CLIMATE_PREFIX, DEMOGRAPHIC_PREFIXES, FeatureDomain, LAG_MARKER, parse_lag_days};

/// Hypotheses kept per pathway
pub const MAX_HYPOTHESES: usize = 10;

const TEMPORAL_CANDIDATES: usize = 5;
const THRESHOLD_CANDIDATES: usize = 3;

/// Template family a hypothesis was generated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisKind {
    ClimateInteraction,
    TemporalMemory,
    DemographicModifier,
    ThresholdEffect,
}

impl HypothesisKind {
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ClimateInteraction => "Climate Interaction",
            Self::TemporalMemory => "Temporal Memory",
            Self::DemographicModifier => "Demographic Modifier",
            Self::ThresholdEffect => "Threshold Effect",
        }
    }
}

impl fmt::Display for HypothesisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResearchPriority {
    High,
    Medium,
    Low,
}

impl ResearchPriority {
    #[must_use]
    pub fn from_evidence(evidence_strength: f64) -> Self {
        if evidence_strength > 0.05 {
            Self::High
        } else if evidence_strength > 0.03 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for ResearchPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        })
    }
}

/// A generated hypothesis with the feature that supports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub kind: HypothesisKind,
    pub statement: String,
    /// Importance share in `[0, 1]`
    pub evidence_strength: f64,
    pub supporting_feature: String,
    /// Importance share in percent
    pub importance_score: f64,
    pub mechanism: String,
}

impl Hypothesis {
    #[must_use]
    pub fn priority(&self) -> ResearchPriority {
        ResearchPriority::from_evidence(self.evidence_strength)
    }
}

/// Maps attribution rankings to hypotheses ranked by evidence strength
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HypothesisGenerator {
    pub max_hypotheses: usize,
}

impl Default for HypothesisGenerator {
    fn default() -> Self {
        Self {
            max_hypotheses: MAX_HYPOTHESES,
        }
    }
}

fn humanize(name: &str, prefixes: &[&str]) -> String {
    let stripped = prefixes
        .iter()
        .find_map(|p| name.strip_prefix(p))
        .unwrap_or(name);
    stripped.replace('_', " ")
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_lag_feature(name: &str) -> bool {
    parse_lag_days(name).is_some()
}

fn is_threshold_feature(name: &str) -> bool {
    name.contains("heat_stress") || name.contains("threshold")
}

fn threshold_level(name: &str) -> &'static str {
    if name.contains("moderate") {
        "moderate (30°C+)"
    } else if name.contains("severe") {
        "severe (35°C+)"
    } else {
        "clinical"
    }
}

impl HypothesisGenerator {
    fn build(kind: HypothesisKind, feature: &FeatureImportance, statement: String, mechanism: String) -> Hypothesis {
        Hypothesis {
            kind,
            statement,
            evidence_strength: feature.importance_pct / 100.0,
            supporting_feature: feature.feature.clone(),
            importance_score: feature.importance_pct,
            mechanism,
        }
    }

    fn climate_interaction(feature: &FeatureImportance, pathway: &str) -> Option<Hypothesis> {
        let (climate, modifier) = feature.feature.split_once(INTERACTION_INFIX)?;
        let climate_var = humanize(climate, &[CLIMATE_PREFIX]);
        let health_var = humanize(modifier, DEMOGRAPHIC_PREFIXES);
        Some(Self::build(
            HypothesisKind::ClimateInteraction,
            feature,
            format!("Climate {climate_var} interacts with {health_var} to influence {pathway} response"),
            format!(
                "Individual variation in {health_var} modifies physiological response to {climate_var} exposure"
            ),
        ))
    }

    fn temporal_memory(feature: &FeatureImportance, pathway: &str) -> Option<Hypothesis> {
        let lag = parse_lag_days(&feature.feature)?;
        let base = feature.feature.split(LAG_MARKER).next().unwrap_or(&feature.feature);
        let climate_var = humanize(base, &[CLIMATE_PREFIX]);
        Some(Self::build(
            HypothesisKind::TemporalMemory,
            feature,
            format!("{lag}-day {climate_var} memory effects significantly influence {pathway} vulnerability"),
            format!(
                "Physiological adaptation to {climate_var} exposure requires {lag} days to manifest in {pathway} biomarkers"
            ),
        ))
    }

    fn demographic_modifier(feature: &FeatureImportance, pathway: &str) -> Hypothesis {
        let demo_var = humanize(&feature.feature, DEMOGRAPHIC_PREFIXES);
        Self::build(
            HypothesisKind::DemographicModifier,
            feature,
            format!(
                "{} modifies the relationship between climate exposure and {pathway} response",
                title_case(&demo_var)
            ),
            format!(
                "Individual variation in {demo_var} affects thermoregulatory capacity and {pathway} vulnerability"
            ),
        )
    }

    fn threshold_effect(feature: &FeatureImportance, pathway: &str) -> Hypothesis {
        let level = threshold_level(&feature.feature);
        Self::build(
            HypothesisKind::ThresholdEffect,
            feature,
            format!("Heat stress threshold effects are evident in {pathway} pathway at {level} levels"),
            format!("Non-linear {pathway} response occurs when heat exposure exceeds {level} thresholds"),
        )
    }

    /// Generate hypotheses for one pathway, strongest evidence first
    #[must_use]
    pub fn generate(&self, attribution: &AttributionResult, pathway: &str) -> Vec<Hypothesis> {
        let top = &attribution.top_features.features;
        let ranked = &attribution.feature_importance;
        let mut hypotheses = Vec::new();

        hypotheses.extend(
            top.iter()
                .filter(|f| f.domain == FeatureDomain::Interaction)
                .filter_map(|f| Self::climate_interaction(f, pathway)),
        );
        hypotheses.extend(
            ranked
                .iter()
                .filter(|f| is_lag_feature(&f.feature))
                .take(TEMPORAL_CANDIDATES)
                .filter_map(|f| Self::temporal_memory(f, pathway)),
        );
        hypotheses.extend(
            top.iter()
                .filter(|f| f.domain == FeatureDomain::Demographic)
                .map(|f| Self::demographic_modifier(f, pathway)),
        );
        hypotheses.extend(
            ranked
                .iter()
                .filter(|f| is_threshold_feature(&f.feature))
                .take(THRESHOLD_CANDIDATES)
                .map(|f| Self::threshold_effect(f, pathway)),
        );

        hypotheses.sort_by(|a, b| b.evidence_strength.total_cmp(&a.evidence_strength));
        hypotheses.truncate(self.max_hypotheses);
        log::debug!("[{pathway}] Generated {} hypotheses", hypotheses.len());
        hypotheses
    }
}

/// Markdown report of a pathway's hypotheses
#[must_use]
pub fn format_report(hypotheses: &[Hypothesis], pathway: &str) -> String {
    let mut out = format!(
        "# Novel Scientific Hypotheses - {} Pathway\n\n",
        title_case(pathway)
    );
    if hypotheses.is_empty() {
        let _ = writeln!(out, "No significant hypotheses generated for {pathway} pathway.");
        return out;
    }

    for (i, h) in hypotheses.iter().enumerate() {
        let _ = writeln!(out, "## Hypothesis {}: {}\n", i + 1, h.kind);
        let _ = writeln!(out, "**Statement:** {}\n", h.statement);
        let _ = writeln!(
            out,
            "**Evidence Strength:** {:.3} ({:.1}% feature importance)\n",
            h.evidence_strength, h.importance_score
        );
        let _ = writeln!(out, "**Supporting Feature:** `{}`\n", h.supporting_feature);
        let _ = writeln!(out, "**Proposed Mechanism:** {}\n", h.mechanism);
        let _ = writeln!(out, "**Research Priority:** {}\n", h.priority());
        out.push_str("---\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::shap::{InteractionSummary, top_features};
    use ndarray::Array2;

    fn importance(feature: &str, pct: f64) -> FeatureImportance {
        FeatureImportance {
            feature: feature.to_string(),
            importance: pct,
            importance_pct: pct,
            domain: FeatureDomain::categorize(feature, &[]),
        }
    }

    fn attribution(ranked: Vec<FeatureImportance>) -> AttributionResult {
        AttributionResult {
            feature_names: ranked.iter().map(|f| f.feature.clone()).collect(),
            base_value: 0.0,
            values: Array2::zeros((0, ranked.len())),
            n_explained: 0,
            sample_predictions: vec![],
            sample_targets: vec![],
            top_features: top_features(&ranked, 10),
            feature_importance: ranked,
            interactions: InteractionSummary {
                strong_interactions: vec![],
                n_strong_interactions: 0,
            },
        }
    }

    #[test]
    fn test_templates_and_ranking() {
        let result = attribution(vec![
            importance("climate_max_temperature_x_demographic_bmi", 40.0),
            importance("climate_heat_index_lag14d", 25.0),
            importance("demographic_age", 20.0),
            importance("climate_heat_stress_severe", 15.0),
        ]);
        let hypotheses = HypothesisGenerator::default().generate(&result, "metabolic");
        assert_eq!(hypotheses.len(), 4);
        assert_eq!(hypotheses[0].kind, HypothesisKind::ClimateInteraction);
        assert_eq!(
            hypotheses[0].statement,
            "Climate max temperature interacts with bmi to influence metabolic response"
        );
        assert!((hypotheses[0].evidence_strength - 0.4).abs() < 1e-12);

        assert_eq!(
            hypotheses[1].statement,
            "14-day heat index memory effects significantly influence metabolic vulnerability"
        );
        assert_eq!(
            hypotheses[2].statement,
            "Age modifies the relationship between climate exposure and metabolic response"
        );
        assert!(hypotheses[3].statement.contains("severe (35°C+)"));
        assert!(hypotheses.windows(2).all(|w| w[0].evidence_strength >= w[1].evidence_strength));
    }

    #[test]
    fn test_cap_and_report() {
        let ranked = (0..12)
            .map(|i| importance(&format!("climate_temp_lag{}d", i + 1), 12.0 - i as f64))
            .chain((0..6).map(|i| importance(&format!("demographic_v{i}"), 0.5)))
            .collect();
        let hypotheses = HypothesisGenerator::default().generate(&attribution(ranked), "renal");
        assert!(hypotheses.len() <= MAX_HYPOTHESES);

        let report = format_report(&hypotheses, "renal");
        assert!(report.starts_with("# Novel Scientific Hypotheses - Renal Pathway"));
        assert!(report.contains("**Research Priority:** High"));

        let empty = format_report(&[], "renal");
        assert!(empty.contains("No significant hypotheses generated for renal pathway."));
    }

    #[test]
    fn test_priority_bands() {
        assert_eq!(ResearchPriority::from_evidence(0.06), ResearchPriority::High);
        assert_eq!(ResearchPriority::from_evidence(0.04), ResearchPriority::Medium);
        assert_eq!(ResearchPriority::from_evidence(0.03), ResearchPriority::Low);
    }
}
