//! Model explanation: feature attributions and the hypotheses drawn from them
//!
//! [`AttributionAnalyzer`] is the seam the orchestrator calls through;
//! [`PermutationShapExplainer`] is the default implementation.

pub mod hypothesis;
pub mod shap;

pub use hypothesis::{
    Hypothesis, HypothesisGenerator, HypothesisKind, MAX_HYPOTHESES, ResearchPriority,
    format_report,
};
pub use shap::{
    AttributionAnalyzer, AttributionInteraction, AttributionResult, ExplainRequest,
    FeatureImportance, InteractionSummary, PermutationShapExplainer, TopFeatures,
    feature_importance, permutation_shapley, top_features,
};
