//! Query classification and finalization.
//!
//! A [`Classifier`] turns text into a loose [`QueryDraft`]. The
//! [`QueryInterpreter`] then fills every gap in the draft (query type,
//! location, time window, sources, visualization) so the resulting
//! [`ParsedQuery`] is always complete.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::NaiveDate;
use climatebud_ai::{CompletionRequest, LlmProvider, create_provider, parse_json_object};
use climatebud_config::AppConfig;
use climatebud_geography_models::Location;
use climatebud_query_models::{
    DataSourceKind, DraftTimeRange, ParsedQuery, QueryDraft, QueryType, TimeRange,
    VisualizationType,
};

use crate::resolver::{
    LocationTimeResolver, extract_location, extract_time_range, normalize_state,
    parse_relative_time,
};

/// Keyword groups checked in order; the first group with a hit decides.
const KEYWORD_RULES: &[(QueryType, &[&str])] = &[
    (QueryType::SpillAnalysis, &["spill", "sso", "overflow", "sewage"]),
    (
        QueryType::RepeatViolators,
        &["repeat", "chronic", "multiple", "frequent"],
    ),
    (
        QueryType::WeatherCorrelation,
        &["weather", "rain", "storm", "correlat"],
    ),
    (QueryType::ViolationTrends, &["trend", "over time", "history"]),
    (QueryType::FacilitySearch, &["find", "search", "where is"]),
];

const SUGGESTED_QUERIES: &[&str] = &[
    "Show me sewage spill patterns in Baldwin County over the last 3 years",
    "Which facilities have the most repeat violations?",
    "Are spills correlated with heavy rainfall events?",
    "What are the violation trends in the past year?",
    "Show an overview of environmental compliance in my area",
];

const DRAFT_SCHEMA: &str = r#"{
    "query_type": "string",
    "location": {
        "state": "two-letter code or null",
        "county": "county name or null",
        "city": "city name or null"
    },
    "time_range": {
        "start_date": "YYYY-MM-DD or null",
        "end_date": "YYYY-MM-DD or null",
        "relative": "e.g., 'last 3 years' or null"
    },
    "data_sources": ["list of sources needed"],
    "visualization_type": "recommended viz type",
    "filters": {
        "violation_types": ["list or null"],
        "severity": ["list or null"],
        "facility_name": "string or null"
    }
}"#;

/// Example prompts shown to users who don't know what to ask.
#[must_use]
pub fn suggested_queries() -> &'static [&'static str] {
    SUGGESTED_QUERIES
}

/// Classifies a question by keyword, in priority order: spill, repeat,
/// weather, trend, search, then general overview.
#[must_use]
pub fn classify_query_type(text: &str) -> QueryType {
    let lower = text.to_lowercase();

    KEYWORD_RULES
        .iter()
        .find(|(_, words)| words.iter().any(|word| lower.contains(word)))
        .map_or(QueryType::GeneralOverview, |(query_type, _)| *query_type)
}

/// Produces a draft interpretation of a question.
///
/// Implementations never fail; anything they cannot determine stays
/// `None` in the draft.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str, today: NaiveDate) -> QueryDraft;
}

/// Keyword and regex classification with no external calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    /// Synchronous form of [`Classifier::classify`].
    #[must_use]
    pub fn draft(text: &str, today: NaiveDate) -> QueryDraft {
        let location = extract_location(text);
        let time_range = extract_time_range(text, today).map(|range| DraftTimeRange {
            start_date: Some(range.start_date()),
            end_date: Some(range.end_date()),
            relative: None,
        });

        QueryDraft {
            query_type: Some(classify_query_type(text)),
            location: Some(location),
            time_range,
            ..QueryDraft::default()
        }
    }
}

#[async_trait::async_trait]
impl Classifier for RuleBasedClassifier {
    async fn classify(&self, text: &str, today: NaiveDate) -> QueryDraft {
        Self::draft(text, today)
    }
}

/// Classification through a language model, with rule-based fallback on
/// any failure.
pub struct ModelBackedClassifier {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    system_prompt: String,
    fallback: RuleBasedClassifier,
}

impl ModelBackedClassifier {
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, temperature: f32) -> Self {
        Self {
            provider,
            temperature,
            system_prompt: system_prompt(),
            fallback: RuleBasedClassifier,
        }
    }
}

#[async_trait::async_trait]
impl Classifier for ModelBackedClassifier {
    async fn classify(&self, text: &str, today: NaiveDate) -> QueryDraft {
        let request = CompletionRequest {
            system: &self.system_prompt,
            user: text,
            json_output: true,
            temperature: self.temperature,
        };

        let result = match self.provider.complete(&request).await {
            Ok(response) => parse_json_object::<QueryDraft>(&response),
            Err(e) => Err(e),
        };

        match result {
            Ok(draft) => {
                log::debug!("Model classified query as {:?}", draft.query_type);
                draft
            }
            Err(e) => {
                log::warn!("Query interpretation via model failed, using rules: {e}");
                self.fallback.classify(text, today).await
            }
        }
    }
}

fn system_prompt() -> String {
    let mut prompt = String::from(
        "You are a query parser for an environmental data analysis system.\n\
         Parse the user's natural language query into structured parameters.\n\n\
         Available query types:\n",
    );
    for query_type in QueryType::all() {
        let _ = writeln!(prompt, "- {query_type}: {}", query_type.description());
    }

    prompt.push_str("\nAvailable data sources:\n");
    for source in DataSourceKind::all() {
        let _ = writeln!(prompt, "- {source}: {}", source.description());
    }

    prompt.push_str("\nVisualization types:\n");
    for viz in VisualizationType::all() {
        let _ = writeln!(prompt, "- {viz}: {}", viz.description());
    }

    prompt.push_str("\nRespond ONLY with valid JSON matching this schema:\n");
    prompt.push_str(DRAFT_SCHEMA);
    prompt
}

/// Entry point: text in, complete [`ParsedQuery`] out.
pub struct QueryInterpreter {
    classifier: Box<dyn Classifier>,
    resolver: LocationTimeResolver,
}

impl QueryInterpreter {
    #[must_use]
    pub fn new(classifier: Box<dyn Classifier>, resolver: LocationTimeResolver) -> Self {
        Self {
            classifier,
            resolver,
        }
    }

    /// Picks the model-backed classifier when a provider can be built from
    /// `config.ai`, the rule-based one otherwise.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let resolver = LocationTimeResolver::new(config.defaults.clone());

        let classifier: Box<dyn Classifier> = match create_provider(&config.ai) {
            Ok(provider) => Box::new(ModelBackedClassifier::new(
                provider,
                config.ai.interpret_temperature,
            )),
            Err(e) => {
                if config.ai.has_credentials() || config.ai.provider.is_some() {
                    log::warn!("Model unavailable, interpreting queries with rules: {e}");
                } else {
                    log::info!("No model configured, interpreting queries with rules");
                }
                Box::new(RuleBasedClassifier)
            }
        };

        Self::new(classifier, resolver)
    }

    /// Interprets `text` relative to the local date.
    pub async fn process_query(&self, text: &str) -> ParsedQuery {
        let today = chrono::Local::now().date_naive();
        self.process_query_on(text, today).await
    }

    /// Interprets `text` with relative periods ending `today`.
    pub async fn process_query_on(&self, text: &str, today: NaiveDate) -> ParsedQuery {
        let draft = self.classifier.classify(text, today).await;
        let parsed = self.finalize(draft, text, today);

        log::info!(
            "Interpreted query as {} for {} ({} to {})",
            parsed.query_type,
            parsed.location,
            parsed.time_range.start_date(),
            parsed.time_range.end_date()
        );

        parsed
    }

    /// Applies defaults to a draft.
    #[must_use]
    pub fn finalize(&self, draft: QueryDraft, text: &str, today: NaiveDate) -> ParsedQuery {
        let query_type = draft
            .query_type
            .unwrap_or_else(|| classify_query_type(text));

        let location = draft.location.unwrap_or_default();
        let location = self.resolver.complete_location(Location {
            state: location.state.as_deref().and_then(normalize_state),
            county: location.county.as_deref().map(strip_county_suffix),
            city: location.city,
        });

        let time_range = self.finalize_time_range(draft.time_range, today);

        let data_sources: BTreeSet<DataSourceKind> = draft
            .data_sources
            .map(|sources| sources.into_iter().collect())
            .filter(|sources: &BTreeSet<_>| !sources.is_empty())
            .unwrap_or_else(|| query_type.default_data_sources());

        let visualization_type = draft
            .visualization_type
            .unwrap_or_else(|| query_type.default_visualization());

        ParsedQuery {
            query_type,
            location,
            time_range,
            data_sources,
            visualization_type,
            filters: draft.filters.unwrap_or_default(),
            original_query: text.to_string(),
        }
    }

    fn finalize_time_range(&self, draft: Option<DraftTimeRange>, today: NaiveDate) -> TimeRange {
        let Some(draft) = draft else {
            return self.resolver.default_time_range(today);
        };

        if let Some(start) = draft.start_date {
            return TimeRange::new(start, draft.end_date.unwrap_or(today));
        }

        draft
            .relative
            .as_deref()
            .and_then(|phrase| parse_relative_time(phrase, today))
            .unwrap_or_else(|| self.resolver.default_time_range(today))
    }
}

fn strip_county_suffix(county: &str) -> String {
    let county = county.trim();
    let lower = county.to_lowercase();
    lower
        .strip_suffix("county")
        .filter(|rest| rest.ends_with(char::is_whitespace))
        .map_or_else(
            || county.to_string(),
            |rest| {
                county
                    .get(..rest.len())
                    .map_or(county, str::trim_end)
                    .to_string()
            },
        )
}

#[cfg(test)]
mod tests {
    use chrono::Days;
    use climatebud_ai::AiError;
    use climatebud_config::DefaultsConfig;

    use super::*;

    struct FakeProvider {
        response: Result<String, String>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for FakeProvider {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, AiError> {
            assert!(request.json_output);
            assert!(request.system.contains("weather_correlation"));
            self.response
                .clone()
                .map_err(|message| AiError::Provider { message })
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn rule_interpreter() -> QueryInterpreter {
        QueryInterpreter::new(
            Box::new(RuleBasedClassifier),
            LocationTimeResolver::new(DefaultsConfig::default()),
        )
    }

    fn model_interpreter(response: Result<String, String>) -> QueryInterpreter {
        let provider = Arc::new(FakeProvider { response });
        QueryInterpreter::new(
            Box::new(ModelBackedClassifier::new(provider, 0.1)),
            LocationTimeResolver::new(DefaultsConfig::default()),
        )
    }

    #[test]
    fn keyword_priority() {
        assert_eq!(
            classify_query_type("sewage overflow after storms"),
            QueryType::SpillAnalysis
        );
        assert_eq!(
            classify_query_type("chronic violators during rain"),
            QueryType::RepeatViolators
        );
        assert_eq!(
            classify_query_type("Does RAINFALL matter?"),
            QueryType::WeatherCorrelation
        );
        assert_eq!(
            classify_query_type("violations over time"),
            QueryType::ViolationTrends
        );
        assert_eq!(
            classify_query_type("where is the treatment plant"),
            QueryType::FacilitySearch
        );
        assert_eq!(
            classify_query_type("tell me about compliance"),
            QueryType::GeneralOverview
        );
    }

    #[tokio::test]
    async fn baldwin_spill_query_without_model() {
        let parsed = rule_interpreter()
            .process_query_on(
                "Show me sewage spill patterns in Baldwin County over the last 3 years",
                today(),
            )
            .await;

        assert_eq!(parsed.query_type, QueryType::SpillAnalysis);
        assert_eq!(parsed.location.state, "AL");
        assert_eq!(parsed.location.county, "Baldwin");
        assert_eq!(parsed.time_range.end_date(), today());
        assert_eq!(
            parsed.time_range.start_date(),
            today() - Days::new(365 * 3)
        );
        assert_eq!(
            parsed.data_sources.into_iter().collect::<Vec<_>>(),
            vec![DataSourceKind::Epa]
        );
        assert_eq!(parsed.visualization_type, VisualizationType::Combined);
        assert!(parsed.filters.is_empty());
    }

    #[tokio::test]
    async fn always_complete() {
        let interpreter = rule_interpreter();
        for text in ["", "???", "rain in 1999", "find plants in Ohio last 2 weeks"] {
            let parsed = interpreter.process_query_on(text, today()).await;
            assert!(!parsed.location.state.is_empty());
            assert!(!parsed.location.county.is_empty());
            assert!(parsed.time_range.start_date() <= parsed.time_range.end_date());
            assert_eq!(parsed.original_query, text);
        }
    }

    #[tokio::test]
    async fn model_draft_is_finalized() {
        let response = r#"```json
        {
            "query_type": "weather_correlation",
            "location": {"state": "Florida", "county": "Miami-Dade County", "city": null},
            "time_range": {"start_date": null, "end_date": null, "relative": "past 6 months"},
            "data_sources": [],
            "visualization_type": null,
            "filters": {"violation_types": null, "severity": ["high"], "facility_name": null}
        }
        ```"#;
        let parsed = model_interpreter(Ok(response.to_string()))
            .process_query_on("rain and spills in Miami", today())
            .await;

        assert_eq!(parsed.query_type, QueryType::WeatherCorrelation);
        assert_eq!(parsed.location.state, "FL");
        assert_eq!(parsed.location.county, "Miami-Dade");
        assert_eq!(parsed.time_range.start_date(), today() - Days::new(180));
        assert_eq!(
            parsed.data_sources.into_iter().collect::<Vec<_>>(),
            vec![DataSourceKind::Epa, DataSourceKind::Noaa]
        );
        assert_eq!(parsed.visualization_type, VisualizationType::Scatter);
        assert_eq!(parsed.filters.severity, Some(vec!["high".to_string()]));
    }

    #[tokio::test]
    async fn model_unknown_type_uses_keywords() {
        let response = r#"{"query_type": "vibes", "time_range": {"start_date": "2024-03-01"}}"#;
        let parsed = model_interpreter(Ok(response.to_string()))
            .process_query_on("any repeat offenders?", today())
            .await;

        assert_eq!(parsed.query_type, QueryType::RepeatViolators);
        assert_eq!(
            parsed.time_range.start_date(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(parsed.time_range.end_date(), today());
        assert_eq!(parsed.location.county, "Baldwin");
    }

    #[tokio::test]
    async fn model_reversed_dates_are_swapped() {
        let response = r#"{"time_range": {"start_date": "2024-12-31", "end_date": "2024-01-01"}}"#;
        let parsed = model_interpreter(Ok(response.to_string()))
            .process_query_on("overview", today())
            .await;

        assert_eq!(
            parsed.time_range.start_date(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(
            parsed.time_range.end_date(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }

    #[tokio::test]
    async fn model_error_falls_back_to_rules() {
        let parsed = model_interpreter(Err("timeout".to_string()))
            .process_query_on("Sewage spills in Mobile County, Alabama in 2023", today())
            .await;

        assert_eq!(parsed.query_type, QueryType::SpillAnalysis);
        assert_eq!(parsed.location.state, "AL");
        assert_eq!(parsed.location.county, "Mobile");
        assert_eq!(
            parsed.time_range.start_date(),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn malformed_model_output_falls_back_to_rules() {
        let parsed = model_interpreter(Ok("Sorry, I can't do that.".to_string()))
            .process_query_on("weather impact", today())
            .await;

        assert_eq!(parsed.query_type, QueryType::WeatherCorrelation);
    }

    #[test]
    fn from_config_without_credentials_uses_rules() {
        let interpreter = QueryInterpreter::from_config(&AppConfig::default());
        let parsed = interpreter.finalize(QueryDraft::default(), "trend", today());
        assert_eq!(parsed.query_type, QueryType::ViolationTrends);
        assert_eq!(parsed.time_range.start_date(), today() - Days::new(1095));
    }

    #[test]
    fn strips_county_suffix() {
        assert_eq!(strip_county_suffix("Baldwin County"), "Baldwin");
        assert_eq!(strip_county_suffix(" harris county "), "harris");
        assert_eq!(strip_county_suffix("Baldwin"), "Baldwin");
        assert_eq!(strip_county_suffix("Oldcounty"), "Oldcounty");
    }

    #[test]
    fn prompt_lists_every_option() {
        let prompt = system_prompt();
        for query_type in QueryType::all() {
            assert!(prompt.contains(query_type.as_ref()));
        }
        for viz in VisualizationType::all() {
            assert!(prompt.contains(viz.as_ref()));
        }
        assert!(prompt.contains("\"relative\""));
    }

    #[test]
    fn five_suggestions() {
        assert_eq!(suggested_queries().len(), 5);
    }
}
