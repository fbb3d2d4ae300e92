#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Turns an [`AnalysisResult`] into an [`Insight`] a non-specialist can
//! read.
//!
//! Two renderers implement [`InsightRenderer`]: [`ModelBackedRenderer`]
//! asks a language model and [`RuleBasedRenderer`] applies fixed
//! templates. The model-backed renderer falls back to the rules on any
//! failure, so rendering never fails. [`create_renderer`] picks one from
//! configuration.

pub mod model;
pub mod rules;

use climatebud_ai::create_provider;
use climatebud_analytics_models::AnalysisResult;
use climatebud_config::AiConfig;
use climatebud_geography_models::ResolvedLocation;
use climatebud_query_models::QueryType;
use serde::{Deserialize, Serialize};

pub use model::ModelBackedRenderer;
pub use rules::RuleBasedRenderer;

/// Structured narrative for one analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Insight {
    /// Two or three sentence overview.
    pub summary: String,
    pub key_findings: Vec<String>,
    pub patterns: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
    /// What the data means for the community.
    pub context: String,
}

/// Renders analysis results as prose.
#[async_trait::async_trait]
pub trait InsightRenderer: Send + Sync {
    /// Builds an [`Insight`] for a single analysis.
    async fn render(
        &self,
        analysis: &AnalysisResult,
        query_type: QueryType,
        location: &ResolvedLocation,
    ) -> Insight;

    /// Writes a short executive summary of the analysis.
    async fn report_summary(&self, analysis: &AnalysisResult, location: &ResolvedLocation)
    -> String;
}

/// Uses the model-backed renderer when a provider can be built from
/// `config`, the rule-based one otherwise.
#[must_use]
pub fn create_renderer(config: &AiConfig) -> Box<dyn InsightRenderer> {
    match create_provider(config) {
        Ok(provider) => Box::new(ModelBackedRenderer::new(
            provider,
            config.insight_temperature,
        )),
        Err(e) => {
            if config.has_credentials() || config.provider.is_some() {
                log::warn!("Model unavailable, rendering insights from templates: {e}");
            } else {
                log::info!("No model configured, rendering insights from templates");
            }
            Box::new(RuleBasedRenderer)
        }
    }
}
