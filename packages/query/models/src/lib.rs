#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query types shared by the interpreter, the pipeline, and presentation.
//!
//! [`ParsedQuery`] is the immutable, fully resolved request the interpreter
//! hands to the rest of the pipeline. [`QueryDraft`] is the loosely typed
//! intermediate form a classifier produces (from a model response or from
//! keyword rules) before defaults are applied.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;
use climatebud_geography_models::{Location, ResolvedLocation};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The kind of analysis a question asks for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum QueryType {
    /// Sewage spill / SSO event patterns.
    SpillAnalysis,
    /// Violation counts over time.
    ViolationTrends,
    /// Facilities with repeated violations.
    RepeatViolators,
    /// Violations versus precipitation.
    WeatherCorrelation,
    /// Locating specific facilities.
    FacilitySearch,
    /// General environmental summary.
    GeneralOverview,
}

impl QueryType {
    /// Returns all variants in classification priority order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::SpillAnalysis,
            Self::ViolationTrends,
            Self::RepeatViolators,
            Self::WeatherCorrelation,
            Self::FacilitySearch,
            Self::GeneralOverview,
        ]
    }

    /// Data sources a query of this type needs when none were requested.
    #[must_use]
    pub fn default_data_sources(self) -> BTreeSet<DataSourceKind> {
        let sources: &[DataSourceKind] = match self {
            Self::SpillAnalysis
            | Self::ViolationTrends
            | Self::RepeatViolators
            | Self::FacilitySearch => &[DataSourceKind::Epa],
            Self::WeatherCorrelation => &[DataSourceKind::Epa, DataSourceKind::Noaa],
            Self::GeneralOverview => &[DataSourceKind::Epa, DataSourceKind::Census],
        };
        sources.iter().copied().collect()
    }

    /// Visualization used when none was requested.
    #[must_use]
    pub const fn default_visualization(self) -> VisualizationType {
        match self {
            Self::SpillAnalysis | Self::GeneralOverview => VisualizationType::Combined,
            Self::ViolationTrends => VisualizationType::TimeSeries,
            Self::RepeatViolators => VisualizationType::BarChart,
            Self::WeatherCorrelation => VisualizationType::Scatter,
            Self::FacilitySearch => VisualizationType::Map,
        }
    }

    /// Short description used in model prompts.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SpillAnalysis => "Analyze sewage spills/SSO events",
            Self::ViolationTrends => "Show violation patterns over time",
            Self::RepeatViolators => "Find facilities with repeated violations",
            Self::WeatherCorrelation => "Correlate environmental issues with weather",
            Self::FacilitySearch => "Find specific facilities",
            Self::GeneralOverview => "General environmental summary",
        }
    }
}

/// An upstream data provider.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DataSourceKind {
    /// EPA ECHO violations, facilities, and compliance.
    Epa,
    /// NOAA weather (precipitation, temperature).
    Noaa,
    /// Census demographics and infrastructure.
    Census,
}

impl DataSourceKind {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Epa, Self::Noaa, Self::Census]
    }

    /// Short description used in model prompts.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Epa => "EPA ECHO data (violations, facilities, compliance)",
            Self::Noaa => "Weather data (precipitation, temperature)",
            Self::Census => "Demographics and infrastructure",
        }
    }
}

/// How the presentation layer should chart the result.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum VisualizationType {
    /// Geographic visualization.
    Map,
    /// Trend over time.
    TimeSeries,
    /// Comparison between categories.
    BarChart,
    /// Correlation plot.
    Scatter,
    /// Density or correlation matrix.
    Heatmap,
    /// Multiple visualizations.
    Combined,
}

impl VisualizationType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Map,
            Self::TimeSeries,
            Self::BarChart,
            Self::Scatter,
            Self::Heatmap,
            Self::Combined,
        ]
    }

    /// Short description used in model prompts.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Map => "Geographic visualization",
            Self::TimeSeries => "Trend over time",
            Self::BarChart => "Comparison between categories",
            Self::Scatter => "Correlation plot",
            Self::Heatmap => "Density or correlation matrix",
            Self::Combined => "Multiple visualizations",
        }
    }
}

/// An inclusive calendar date range. `start_date <= end_date` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TimeRange {
    /// Creates a range, swapping the bounds if they are reversed.
    #[must_use]
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        if start_date <= end_date {
            Self {
                start_date,
                end_date,
            }
        } else {
            Self {
                start_date: end_date,
                end_date: start_date,
            }
        }
    }

    /// First day of the range.
    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Last day of the range.
    #[must_use]
    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Returns `true` if `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            start_date: NaiveDate,
            end_date: NaiveDate,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(Self::new(raw.start_date, raw.end_date))
    }
}

/// Optional refinements on the violation records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilters {
    /// Keep only these violation types (case-insensitive substring match).
    pub violation_types: Option<Vec<String>>,
    /// Keep only these severity levels (`low`, `medium`, `high`, `unknown`).
    pub severity: Option<Vec<String>>,
    /// Keep only facilities whose name contains this text.
    pub facility_name: Option<String>,
}

impl QueryFilters {
    /// Returns `true` if no refinement is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violation_types.as_ref().is_none_or(Vec::is_empty)
            && self.severity.as_ref().is_none_or(Vec::is_empty)
            && self
                .facility_name
                .as_deref()
                .is_none_or(|name| name.trim().is_empty())
    }
}

/// A fully interpreted natural-language query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Analysis requested.
    pub query_type: QueryType,
    /// Location with state and county always resolved.
    pub location: ResolvedLocation,
    /// Date window to fetch.
    pub time_range: TimeRange,
    /// Providers to fetch from.
    pub data_sources: BTreeSet<DataSourceKind>,
    /// Recommended visualization.
    pub visualization_type: VisualizationType,
    /// Optional record refinements.
    pub filters: QueryFilters,
    /// The verbatim input text.
    pub original_query: String,
}

/// Time range as a classifier reports it. Any part may be missing or
/// unparseable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftTimeRange {
    /// Explicit start date.
    #[serde(deserialize_with = "lenient")]
    pub start_date: Option<NaiveDate>,
    /// Explicit end date.
    #[serde(deserialize_with = "lenient")]
    pub end_date: Option<NaiveDate>,
    /// Relative phrase such as `"last 3 years"`.
    pub relative: Option<String>,
}

/// A classifier's output before defaults are applied.
///
/// Deserialization is lenient: unknown enum values and malformed dates
/// become `None` instead of failing the whole draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDraft {
    /// Classified analysis type.
    #[serde(deserialize_with = "lenient")]
    pub query_type: Option<QueryType>,
    /// Location named in the query.
    pub location: Option<Location>,
    /// Time window named in the query.
    pub time_range: Option<DraftTimeRange>,
    /// Requested providers; unknown names are dropped.
    #[serde(deserialize_with = "lenient_list")]
    pub data_sources: Option<Vec<DataSourceKind>>,
    /// Requested visualization.
    #[serde(deserialize_with = "lenient")]
    pub visualization_type: Option<VisualizationType>,
    /// Requested refinements.
    pub filters: Option<QueryFilters>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.trim().parse().ok()))
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(serde_json::Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(serde_json::Value::as_str)
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn query_type_parses_snake_case() {
        assert_eq!(
            "weather_correlation".parse::<QueryType>().unwrap(),
            QueryType::WeatherCorrelation
        );
        assert_eq!(
            "Spill_Analysis".parse::<QueryType>().unwrap(),
            QueryType::SpillAnalysis
        );
        assert!("spills".parse::<QueryType>().is_err());
        assert_eq!(QueryType::RepeatViolators.to_string(), "repeat_violators");
    }

    #[test]
    fn data_source_defaults() {
        let weather = QueryType::WeatherCorrelation.default_data_sources();
        assert_eq!(
            weather.into_iter().collect::<Vec<_>>(),
            vec![DataSourceKind::Epa, DataSourceKind::Noaa]
        );
        let overview = QueryType::GeneralOverview.default_data_sources();
        assert!(overview.contains(&DataSourceKind::Census));
        for qt in QueryType::all() {
            assert!(qt.default_data_sources().contains(&DataSourceKind::Epa));
        }
    }

    #[test]
    fn visualization_defaults() {
        assert_eq!(
            QueryType::SpillAnalysis.default_visualization(),
            VisualizationType::Combined
        );
        assert_eq!(
            QueryType::ViolationTrends.default_visualization(),
            VisualizationType::TimeSeries
        );
        assert_eq!(
            QueryType::RepeatViolators.default_visualization(),
            VisualizationType::BarChart
        );
        assert_eq!(
            QueryType::WeatherCorrelation.default_visualization(),
            VisualizationType::Scatter
        );
        assert_eq!(
            QueryType::FacilitySearch.default_visualization(),
            VisualizationType::Map
        );
    }

    #[test]
    fn time_range_swaps_reversed_bounds() {
        let range = TimeRange::new(date(2024, 5, 1), date(2023, 1, 1));
        assert_eq!(range.start_date(), date(2023, 1, 1));
        assert_eq!(range.end_date(), date(2024, 5, 1));
        assert!(range.contains(date(2023, 6, 1)));
        assert!(!range.contains(date(2024, 5, 2)));
    }

    #[test]
    fn time_range_deserialize_keeps_invariant() {
        let range: TimeRange =
            serde_json::from_str(r#"{"start_date": "2025-01-01", "end_date": "2024-01-01"}"#)
                .unwrap();
        assert!(range.start_date() <= range.end_date());
    }

    #[test]
    fn draft_is_lenient() {
        let draft: QueryDraft = serde_json::from_str(
            r#"{
                "query_type": "not_a_type",
                "location": {"state": "AL", "county": null, "city": null},
                "time_range": {"start_date": "yesterday", "end_date": null, "relative": "last 2 years"},
                "data_sources": ["epa", "twitter", "noaa"],
                "visualization_type": "scatter",
                "filters": {"violation_types": null, "severity": ["high"], "facility_name": null}
            }"#,
        )
        .unwrap();

        assert_eq!(draft.query_type, None);
        let time = draft.time_range.unwrap();
        assert_eq!(time.start_date, None);
        assert_eq!(time.relative.as_deref(), Some("last 2 years"));
        assert_eq!(
            draft.data_sources,
            Some(vec![DataSourceKind::Epa, DataSourceKind::Noaa])
        );
        assert_eq!(draft.visualization_type, Some(VisualizationType::Scatter));
        assert_eq!(
            draft.filters.unwrap().severity,
            Some(vec!["high".to_string()])
        );
    }

    #[test]
    fn empty_filters() {
        assert!(QueryFilters::default().is_empty());
        let filters = QueryFilters {
            facility_name: Some("Foley".to_string()),
            ..QueryFilters::default()
        };
        assert!(!filters.is_empty());
    }
}
