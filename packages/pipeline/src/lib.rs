#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query-to-insight orchestration.
//!
//! A [`Pipeline`] runs one question through four stages in order:
//! interpret the text, fetch the tables the query type needs, analyze
//! them, and render an insight. Every stage after configuration is
//! infallible, so a question always produces a [`PipelineResponse`].

pub mod filters;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use climatebud_analytics::{
    analyze_repeat_violators, analyze_spill_patterns, analyze_weather_correlation,
    summarize_datasets,
};
use climatebud_analytics_models::{AnalysisResult, DatasetSummary, Datasets};
use climatebud_config::{AppConfig, ConfigError};
use climatebud_insights::{Insight, InsightRenderer, create_renderer};
use climatebud_query::QueryInterpreter;
use climatebud_query_models::{DataSourceKind, ParsedQuery, QueryType};
use climatebud_source::{CsvDirectorySource, EmptySource, EnvironmentalDataSource};
use serde::Serialize;

pub use filters::apply_filters;

/// Errors that can occur while building a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The configured data directory exists but is not a directory.
    #[error("Data path is not a directory: {}", path.display())]
    DataDirectory {
        /// The offending path.
        path: PathBuf,
    },
}

/// Everything produced for one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResponse {
    pub query: ParsedQuery,
    pub analysis: AnalysisResult,
    pub insight: Insight,
    /// Cross-dataset overview, for general overview questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<DatasetSummary>,
}

/// Interpreter, data source, and insight renderer wired together.
pub struct Pipeline {
    interpreter: QueryInterpreter,
    source: Box<dyn EnvironmentalDataSource>,
    renderer: Box<dyn InsightRenderer>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        interpreter: QueryInterpreter,
        source: Box<dyn EnvironmentalDataSource>,
        renderer: Box<dyn InsightRenderer>,
    ) -> Self {
        Self {
            interpreter,
            source,
            renderer,
        }
    }

    /// Builds a pipeline from configuration.
    ///
    /// Reads CSV tables from `config.data.directory` when it exists and
    /// falls back to an empty source when it does not.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DataDirectory`] if the data path exists but
    /// is not a directory.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let source = data_source(&config.data.directory)?;
        Ok(Self::new(
            QueryInterpreter::from_config(config),
            source,
            create_renderer(&config.ai),
        ))
    }

    /// Loads configuration from `path` (plus environment overrides) and
    /// builds a pipeline from it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the configuration cannot be loaded or
    /// the data path is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let config = AppConfig::load(path)?;
        Self::from_config(&config)
    }

    #[must_use]
    pub const fn interpreter(&self) -> &QueryInterpreter {
        &self.interpreter
    }

    /// Answers `text` with relative periods ending today.
    pub async fn ask(&self, text: &str) -> PipelineResponse {
        let query = self.interpreter.process_query(text).await;
        self.run(query).await
    }

    /// Answers `text` with relative periods ending `today`.
    pub async fn ask_on(&self, text: &str, today: NaiveDate) -> PipelineResponse {
        let query = self.interpreter.process_query_on(text, today).await;
        self.run(query).await
    }

    /// Fetches, analyzes, and renders an already interpreted query.
    pub async fn run(&self, query: ParsedQuery) -> PipelineResponse {
        let datasets = self.fetch(&query).await;
        let analysis = analyze(query.query_type, &datasets);

        if let Some(error) = &analysis.error {
            log::warn!("Analysis for {} incomplete: {error}", query.query_type);
        }

        let overview =
            (query.query_type == QueryType::GeneralOverview).then(|| summarize_datasets(&datasets));

        let insight = self
            .renderer
            .render(&analysis, query.query_type, &query.location)
            .await;

        PipelineResponse {
            query,
            analysis,
            insight,
            overview,
        }
    }

    /// Writes an executive summary for a finished response.
    pub async fn report_summary(&self, response: &PipelineResponse) -> String {
        self.renderer
            .report_summary(&response.analysis, &response.query.location)
            .await
    }

    /// Fetches every table the query needs.
    ///
    /// The query type's own sources are always fetched in addition to
    /// whatever the interpreter listed, so a weather question always gets
    /// precipitation.
    pub async fn fetch(&self, query: &ParsedQuery) -> Datasets {
        let location = &query.location;
        let (start, end) = (query.time_range.start_date(), query.time_range.end_date());
        let mut kinds = query.query_type.default_data_sources();
        kinds.extend(query.data_sources.iter().copied());

        let mut datasets = Datasets::default();

        if kinds.contains(&DataSourceKind::Epa) {
            let violations = self
                .source
                .get_violations(&location.state, &location.county, start, end)
                .await;
            datasets.violations = apply_filters(&violations, &query.filters);

            if query.query_type == QueryType::FacilitySearch {
                datasets.facilities = self
                    .source
                    .get_facilities(&location.state, &location.county)
                    .await;
            }
        }

        if kinds.contains(&DataSourceKind::Noaa) {
            datasets.precipitation = self.source.get_precipitation(location, start, end).await;
        }

        if kinds.contains(&DataSourceKind::Census) {
            datasets.population = self
                .source
                .get_population(&location.state, &location.county)
                .await;
            datasets.income = self
                .source
                .get_income_demographics(&location.state, &location.county)
                .await;
        }

        log::info!(
            "Fetched {} violations, {} facilities, {} precipitation days for {location}",
            datasets.violations.len(),
            datasets.facilities.len(),
            datasets.precipitation.len()
        );

        datasets
    }
}

/// Runs the analysis matching `query_type`.
#[must_use]
pub fn analyze(query_type: QueryType, datasets: &Datasets) -> AnalysisResult {
    let weather = (!datasets.precipitation.is_empty()).then_some(datasets.precipitation.as_slice());

    match query_type {
        QueryType::RepeatViolators => analyze_repeat_violators(&datasets.violations),
        QueryType::WeatherCorrelation => {
            analyze_weather_correlation(&datasets.violations, &datasets.precipitation)
        }
        QueryType::SpillAnalysis
        | QueryType::ViolationTrends
        | QueryType::FacilitySearch
        | QueryType::GeneralOverview => analyze_spill_patterns(&datasets.violations, weather),
    }
}

fn data_source(directory: &Path) -> Result<Box<dyn EnvironmentalDataSource>, PipelineError> {
    if directory.is_dir() {
        log::info!("Reading data from {}", directory.display());
        Ok(Box::new(CsvDirectorySource::new(directory)))
    } else if directory.exists() {
        Err(PipelineError::DataDirectory {
            path: directory.to_path_buf(),
        })
    } else {
        log::warn!(
            "Data directory {} not found, analyses will report missing data",
            directory.display()
        );
        Ok(Box::new(EmptySource))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use climatebud_analytics_models::{
        IncomeRecord, PopulationRecord, PrecipitationRecord, Severity, ViolationRecord,
        ViolationTable,
    };
    use climatebud_config::DefaultsConfig;
    use climatebud_geography_models::ResolvedLocation;
    use climatebud_insights::RuleBasedRenderer;
    use climatebud_query::{LocationTimeResolver, RuleBasedClassifier};

    use super::*;

    #[derive(Default)]
    struct FakeSource {
        datasets: Datasets,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait::async_trait]
    impl EnvironmentalDataSource for FakeSource {
        async fn get_violations(
            &self,
            state: &str,
            county: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> ViolationTable {
            self.record(format!("violations {state} {county} {start} {end}"));
            self.datasets.violations.clone()
        }

        async fn get_facilities(
            &self,
            _state: &str,
            _county: &str,
        ) -> Vec<climatebud_analytics_models::FacilityRecord> {
            self.record("facilities".to_string());
            self.datasets.facilities.clone()
        }

        async fn get_precipitation(
            &self,
            _location: &ResolvedLocation,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Vec<PrecipitationRecord> {
            self.record("precipitation".to_string());
            self.datasets.precipitation.clone()
        }

        async fn get_population(&self, _state: &str, _county: &str) -> Vec<PopulationRecord> {
            self.record("population".to_string());
            self.datasets.population.clone()
        }

        async fn get_income_demographics(
            &self,
            _state: &str,
            _county: &str,
        ) -> Vec<IncomeRecord> {
            self.record("income".to_string());
            self.datasets.income.clone()
        }
    }

    /// Forwards to a shared fake so tests can inspect calls afterwards.
    struct SharedSource(std::sync::Arc<FakeSource>);

    #[async_trait::async_trait]
    impl EnvironmentalDataSource for SharedSource {
        async fn get_violations(
            &self,
            state: &str,
            county: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> ViolationTable {
            self.0.get_violations(state, county, start, end).await
        }

        async fn get_facilities(
            &self,
            state: &str,
            county: &str,
        ) -> Vec<climatebud_analytics_models::FacilityRecord> {
            self.0.get_facilities(state, county).await
        }

        async fn get_precipitation(
            &self,
            location: &ResolvedLocation,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Vec<PrecipitationRecord> {
            self.0.get_precipitation(location, start, end).await
        }

        async fn get_population(&self, state: &str, county: &str) -> Vec<PopulationRecord> {
            self.0.get_population(state, county).await
        }

        async fn get_income_demographics(&self, state: &str, county: &str) -> Vec<IncomeRecord> {
            self.0.get_income_demographics(state, county).await
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn violations() -> ViolationTable {
        let row = |name: &str, day: NaiveDate, severity: Severity| ViolationRecord {
            facility_name: Some(name.to_string()),
            violation_date: Some(day),
            violation_type: Some("Sanitary Sewer Overflow".to_string()),
            severity: Some(severity),
            ..ViolationRecord::default()
        };
        ViolationTable::from_records(vec![
            row("Foley WWTP", date(2024, 7, 2), Severity::High),
            row("Foley WWTP", date(2024, 8, 9), Severity::Medium),
            row("Daphne Utilities", date(2024, 9, 1), Severity::Low),
            row("Foley WWTP", date(2024, 10, 4), Severity::High),
        ])
    }

    fn pipeline(datasets: Datasets) -> (Pipeline, std::sync::Arc<FakeSource>) {
        let fake = std::sync::Arc::new(FakeSource {
            datasets,
            calls: Mutex::new(Vec::new()),
        });
        let interpreter = QueryInterpreter::new(
            Box::new(RuleBasedClassifier),
            LocationTimeResolver::new(DefaultsConfig::default()),
        );
        let pipeline = Pipeline::new(
            interpreter,
            Box::new(SharedSource(fake.clone())),
            Box::new(RuleBasedRenderer),
        );
        (pipeline, fake)
    }

    #[tokio::test]
    async fn spill_question_end_to_end() {
        let (pipeline, fake) = pipeline(Datasets {
            violations: violations(),
            ..Datasets::default()
        });

        let response = pipeline
            .ask_on(
                "Show me sewage spill patterns in Baldwin County over the last 3 years",
                today(),
            )
            .await;

        assert_eq!(response.query.query_type, QueryType::SpillAnalysis);
        assert_eq!(response.analysis.total_incidents, Some(4));
        assert!(response.overview.is_none());
        assert!(response.insight.summary.contains("4 environmental incidents"));

        let calls = fake.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec!["violations AL Baldwin 2022-06-16 2025-06-15".to_string()]
        );
    }

    #[tokio::test]
    async fn weather_question_fetches_precipitation() {
        let (pipeline, fake) = pipeline(Datasets {
            violations: violations(),
            ..Datasets::default()
        });

        let response = pipeline
            .ask_on("Does rain cause violations in Baldwin County?", today())
            .await;

        assert_eq!(response.query.query_type, QueryType::WeatherCorrelation);
        assert_eq!(
            response.analysis.error.as_deref(),
            Some("Insufficient data for correlation analysis")
        );
        assert!(fake
            .calls
            .lock()
            .unwrap()
            .contains(&"precipitation".to_string()));
    }

    #[tokio::test]
    async fn overview_includes_dataset_summary() {
        let (pipeline, fake) = pipeline(Datasets {
            violations: violations(),
            population: vec![PopulationRecord {
                state: Some("AL".to_string()),
                county: Some("Baldwin".to_string()),
                population: Some(200_000),
            }],
            ..Datasets::default()
        });

        let response = pipeline
            .ask_on("Give me an overview of Baldwin County", today())
            .await;

        assert_eq!(response.query.query_type, QueryType::GeneralOverview);
        let overview = response.overview.unwrap();
        assert_eq!(overview.violations.unwrap().total, 4);
        assert_eq!(overview.per_capita.unwrap().violations_per_100k, 2.0);
        assert!(fake.calls.lock().unwrap().contains(&"income".to_string()));
    }

    #[tokio::test]
    async fn filters_apply_before_analysis() {
        let (pipeline, _fake) = pipeline(Datasets {
            violations: violations(),
            ..Datasets::default()
        });
        let mut query = pipeline
            .interpreter()
            .process_query_on("repeat violators in Baldwin County", today())
            .await;
        query.filters.facility_name = Some("foley".to_string());

        let response = pipeline.run(query).await;

        let summary = response.analysis.repeat_violators.unwrap();
        assert_eq!(summary.total_facilities, 1);
        assert_eq!(summary.repeat_violators, 1);
    }

    #[tokio::test]
    async fn empty_source_reports_missing_data() {
        let pipeline = Pipeline::new(
            QueryInterpreter::new(
                Box::new(RuleBasedClassifier),
                LocationTimeResolver::new(DefaultsConfig::default()),
            ),
            Box::new(EmptySource),
            Box::new(RuleBasedRenderer),
        );

        let response = pipeline.ask_on("show spills", today()).await;

        assert_eq!(
            response.analysis.error.as_deref(),
            Some("No violation data available")
        );
        assert!(response
            .insight
            .concerns
            .contains(&"Analysis incomplete: No violation data available".to_string()));
        let summary = pipeline.report_summary(&response).await;
        assert!(summary.contains("multiple recorded incidents"));
    }

    #[test]
    fn analysis_dispatch() {
        let datasets = Datasets {
            violations: violations(),
            ..Datasets::default()
        };
        assert!(analyze(QueryType::RepeatViolators, &datasets)
            .repeat_violators
            .is_some());
        assert!(analyze(QueryType::ViolationTrends, &datasets).temporal.is_some());
        assert!(analyze(QueryType::FacilitySearch, &datasets).by_facility.is_some());
        assert!(analyze(QueryType::WeatherCorrelation, &datasets).is_error());
    }

    #[test]
    fn response_json_omits_missing_overview() {
        let json = serde_json::to_value(PipelineResponse {
            query: ParsedQuery {
                query_type: QueryType::SpillAnalysis,
                location: ResolvedLocation {
                    state: "AL".to_string(),
                    county: "Baldwin".to_string(),
                    city: None,
                },
                time_range: climatebud_query_models::TimeRange::new(today(), today()),
                data_sources: QueryType::SpillAnalysis.default_data_sources(),
                visualization_type: QueryType::SpillAnalysis.default_visualization(),
                filters: climatebud_query_models::QueryFilters::default(),
                original_query: "spills".to_string(),
            },
            analysis: AnalysisResult::error("No violation data available"),
            insight: Insight::default(),
            overview: None,
        })
        .unwrap();

        assert!(json.get("overview").is_none());
        assert_eq!(json["analysis"]["error"], "No violation data available");
        assert_eq!(json["query"]["query_type"], "spill_analysis");
    }

    #[test]
    fn missing_data_directory_uses_empty_source() {
        let path = std::env::temp_dir().join("climatebud_pipeline_no_such_dir");
        assert!(data_source(&path).is_ok());
    }

    #[test]
    fn data_path_must_be_a_directory() {
        let path = std::env::temp_dir().join(format!(
            "climatebud_pipeline_file_{}",
            std::process::id()
        ));
        std::fs::write(&path, "not a directory").unwrap();
        let result = data_source(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(PipelineError::DataDirectory { .. })));
    }
}
