//! Insights written by a language model.

use std::sync::Arc;

use climatebud_ai::{AiError, CompletionRequest, LlmProvider, parse_json_object};
use climatebud_analytics_models::AnalysisResult;
use climatebud_geography_models::ResolvedLocation;
use climatebud_query_models::QueryType;

use crate::rules::RuleBasedRenderer;
use crate::{Insight, InsightRenderer};

const INSIGHT_SYSTEM_PROMPT: &str = "\
You are an environmental data analyst helping local communities understand \
environmental issues. Generate clear, actionable insights from data analysis results.

Your insights should be:
1. Written for non-technical audiences
2. Focused on community impact
3. Actionable with specific recommendations
4. Based only on the provided data

Respond ONLY with valid JSON matching this schema:
{
  \"summary\": \"2-3 sentence overview\",
  \"key_findings\": [\"finding 1\", \"finding 2\"],
  \"patterns\": [\"pattern 1\"],
  \"concerns\": [\"concern 1\"],
  \"recommendations\": [\"recommendation 1\"],
  \"context\": \"what this means for the community\"
}";

const SUMMARY_SYSTEM_PROMPT: &str = "\
You are writing an executive summary for an environmental report. \
Be concise, factual, and accessible to community members.";

/// Renders insights through an [`LlmProvider`], falling back to
/// [`RuleBasedRenderer`] when the call fails or the reply is unusable.
pub struct ModelBackedRenderer {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
}

impl ModelBackedRenderer {
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, temperature: f32) -> Self {
        Self {
            provider,
            temperature,
        }
    }

    async fn request_insight(
        &self,
        analysis: &AnalysisResult,
        query_type: QueryType,
        location: &ResolvedLocation,
    ) -> Result<Insight, AiError> {
        let results = serde_json::to_string_pretty(analysis)?;
        let user = format!(
            "Analyze these environmental data results for {location}.\n\n\
             Query type: {query_type}\n\n\
             Analysis results:\n{results}\n\n\
             Generate insights in JSON format."
        );

        let response = self
            .provider
            .complete(&CompletionRequest {
                system: INSIGHT_SYSTEM_PROMPT,
                user: &user,
                json_output: true,
                temperature: self.temperature,
            })
            .await?;

        let insight: Insight = parse_json_object(&response)?;
        if insight.summary.trim().is_empty() {
            return Err(AiError::Provider {
                message: "Insight response has no summary".to_string(),
            });
        }
        Ok(insight)
    }

    async fn request_summary(
        &self,
        analysis: &AnalysisResult,
        location: &ResolvedLocation,
    ) -> Result<String, AiError> {
        let results = serde_json::to_string_pretty(analysis)?;
        let user = format!(
            "Write a 3-4 paragraph executive summary for an environmental analysis of \
             {location}.\n\n\
             Analysis results:\n{results}\n\n\
             Focus on the most important findings and actionable recommendations."
        );

        let text = self
            .provider
            .complete(&CompletionRequest {
                system: SUMMARY_SYSTEM_PROMPT,
                user: &user,
                json_output: false,
                temperature: self.temperature,
            })
            .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(AiError::Provider {
                message: "Summary response is empty".to_string(),
            });
        }
        Ok(text.to_string())
    }
}

#[async_trait::async_trait]
impl InsightRenderer for ModelBackedRenderer {
    async fn render(
        &self,
        analysis: &AnalysisResult,
        query_type: QueryType,
        location: &ResolvedLocation,
    ) -> Insight {
        match self.request_insight(analysis, query_type, location).await {
            Ok(insight) => insight,
            Err(e) => {
                log::warn!("Insight generation via model failed, using templates: {e}");
                RuleBasedRenderer::insight(analysis, query_type, location)
            }
        }
    }

    async fn report_summary(
        &self,
        analysis: &AnalysisResult,
        location: &ResolvedLocation,
    ) -> String {
        match self.request_summary(analysis, location).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Summary generation via model failed, using template: {e}");
                RuleBasedRenderer::summary(analysis, location)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct FakeProvider {
        response: Result<String, String>,
        seen: Mutex<Vec<(String, bool)>>,
    }

    impl FakeProvider {
        fn new(response: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                response: response.map(str::to_string).map_err(str::to_string),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for FakeProvider {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, AiError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.user.to_string(), request.json_output));
            self.response
                .clone()
                .map_err(|message| AiError::Provider { message })
        }
    }

    fn baldwin() -> ResolvedLocation {
        ResolvedLocation {
            state: "AL".to_string(),
            county: "Baldwin".to_string(),
            city: None,
        }
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            total_incidents: Some(42),
            ..AnalysisResult::default()
        }
    }

    #[tokio::test]
    async fn uses_model_insight() {
        let provider = FakeProvider::new(Ok(
            r#"{"summary": "Spills are rising.", "key_findings": ["42 spills"]}"#,
        ));
        let renderer = ModelBackedRenderer::new(provider.clone(), 0.5);

        let insight = renderer
            .render(&analysis(), QueryType::SpillAnalysis, &baldwin())
            .await;

        assert_eq!(insight.summary, "Spills are rising.");
        assert_eq!(insight.key_findings, vec!["42 spills"]);
        assert!(insight.recommendations.is_empty());

        let seen = provider.seen.lock().unwrap();
        let (user, json_output) = &seen[0];
        assert!(*json_output);
        assert!(user.contains("Baldwin County, AL"));
        assert!(user.contains("Query type: spill_analysis"));
        assert!(user.contains("\"total_incidents\": 42"));
    }

    #[tokio::test]
    async fn falls_back_on_provider_error() {
        let renderer = ModelBackedRenderer::new(FakeProvider::new(Err("timeout")), 0.5);
        let insight = renderer
            .render(&analysis(), QueryType::SpillAnalysis, &baldwin())
            .await;
        assert_eq!(
            insight,
            RuleBasedRenderer::insight(&analysis(), QueryType::SpillAnalysis, &baldwin())
        );
    }

    #[tokio::test]
    async fn falls_back_on_empty_summary() {
        let renderer =
            ModelBackedRenderer::new(FakeProvider::new(Ok(r#"{"key_findings": []}"#)), 0.5);
        let insight = renderer
            .render(&analysis(), QueryType::GeneralOverview, &baldwin())
            .await;
        assert_eq!(insight.summary, "Environmental overview for Baldwin County, AL.");
    }

    #[tokio::test]
    async fn falls_back_on_non_json() {
        let renderer =
            ModelBackedRenderer::new(FakeProvider::new(Ok("I can't do that")), 0.5);
        let insight = renderer
            .render(&analysis(), QueryType::RepeatViolators, &baldwin())
            .await;
        assert!(insight.summary.starts_with("Analysis identified"));
    }

    #[tokio::test]
    async fn summary_is_plain_text() {
        let provider = FakeProvider::new(Ok("  Baldwin County saw 42 incidents.\n"));
        let renderer = ModelBackedRenderer::new(provider.clone(), 0.5);

        let text = renderer.report_summary(&analysis(), &baldwin()).await;

        assert_eq!(text, "Baldwin County saw 42 incidents.");
        assert!(!provider.seen.lock().unwrap()[0].1);
    }

    #[tokio::test]
    async fn summary_falls_back_when_empty() {
        let renderer = ModelBackedRenderer::new(FakeProvider::new(Ok("   ")), 0.5);
        let text = renderer.report_summary(&analysis(), &baldwin()).await;
        assert!(text.contains("covers 42 recorded incidents"));
    }
}
