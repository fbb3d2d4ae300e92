#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record tables consumed by the analysis engine and the result types it
//! produces.
//!
//! An [`AnalysisResult`] is a set of optional facets. A facet is present
//! only when the input carried the columns it needs, and absent facets are
//! omitted from the serialized JSON. When required data is missing
//! entirely, only [`AnalysisResult::error`] is set.

pub mod records;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

pub use records::{
    Datasets, FacilityRecord, IncomeRecord, PopulationRecord, PrecipitationRecord, Severity,
    ViolationColumns, ViolationRecord, ViolationTable,
};

/// Value counts ordered by descending count, ties in first-occurrence
/// order.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable(Vec<(String, usize)>);

impl FrequencyTable {
    /// Counts `values`.
    pub fn from_values<S: AsRef<str>>(values: impl IntoIterator<Item = S>) -> Self {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut entries: Vec<(String, usize)> = Vec::new();

        for value in values {
            let value = value.as_ref();
            if let Some(&i) = index.get(value) {
                entries[i].1 += 1;
            } else {
                index.insert(value.to_string(), entries.len());
                entries.push((value.to_string(), 1));
            }
        }

        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self(entries)
    }

    /// Entries in order.
    #[must_use]
    pub fn entries(&self) -> &[(String, usize)] {
        &self.0
    }

    /// Count for `key`, if it occurred.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<usize> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, c)| *c)
    }

    /// The most frequent value.
    #[must_use]
    pub fn first(&self) -> Option<(&str, usize)> {
        self.0.first().map(|(k, c)| (k.as_str(), *c))
    }

    /// Keeps only the first `n` entries.
    #[must_use]
    pub fn truncated(mut self, n: usize) -> Self {
        self.0.truncate(n);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, c)| c).sum()
    }
}

impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FrequencyTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = FrequencyTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of value to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, count)) = access.next_entry::<String, usize>()? {
                    entries.push((key, count));
                }
                Ok(FrequencyTable(entries))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Direction of the monthly incident count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    /// Fewer than three months with data.
    InsufficientData,
}

/// Earliest and latest violation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Incident counts over the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalPatterns {
    /// Month of year (1-12) to count.
    pub by_month: BTreeMap<u32, usize>,
    pub by_year: BTreeMap<i32, usize>,
    /// Quarter (1-4) to count.
    pub by_quarter: BTreeMap<u32, usize>,
    /// Month of year with the most incidents; the smallest month on ties.
    pub peak_month: u32,
    pub trend: Trend,
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A 0.01° bin with many incidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Mean latitude of incidents in the bin.
    pub lat: f64,
    /// Mean longitude of incidents in the bin.
    pub lon: f64,
    pub count: usize,
    /// First facility named in the bin, or `"Unknown"`.
    pub name: String,
}

/// Geographic spread of incidents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialPatterns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<Coordinates>,
    /// Sample standard deviation of distances to the center, in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread: Option<f64>,
    pub hotspots: Vec<Hotspot>,
}

/// Incident counts per facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityBreakdown {
    pub total_facilities: usize,
    /// Up to ten facilities with the most incidents.
    pub top_violators: FrequencyTable,
    pub single_incident_facilities: usize,
    pub repeat_violator_count: usize,
}

/// Rainfall totals over the fetched window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub total_rainfall_inches: f64,
    pub avg_daily_rainfall: f64,
    /// Days with more than 0.1 inches.
    pub rainy_days: usize,
    /// Days with more than 1.0 inch.
    pub heavy_rain_days: usize,
}

/// Facility tier by incident count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViolatorCategory {
    /// Ten or more violations.
    Chronic,
    /// Three to nine violations.
    Repeat,
    /// Fewer than three violations.
    Occasional,
}

impl ViolatorCategory {
    #[must_use]
    pub const fn from_count(count: usize) -> Self {
        if count >= 10 {
            Self::Chronic
        } else if count >= 3 {
            Self::Repeat
        } else {
            Self::Occasional
        }
    }
}

/// One facility's violation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityProfile {
    pub facility_name: String,
    pub violation_count: usize,
    pub first_violation: Option<NaiveDate>,
    pub last_violation: Option<NaiveDate>,
    /// Most frequent violation type, or `"Unknown"`.
    pub primary_violation_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Days between first and last violation; 0 without dates.
    pub active_days: i64,
    pub violations_per_year: f64,
    pub category: ViolatorCategory,
}

/// Facilities tiered by how often they violate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatViolatorSummary {
    pub total_facilities: usize,
    pub chronic_violators: usize,
    pub repeat_violators: usize,
    pub occasional_violators: usize,
    /// Up to ten facilities by violation count.
    pub top_violators: Vec<FacilityProfile>,
    /// Up to five facilities by violations per year.
    pub highest_frequency: Vec<FacilityProfile>,
}

/// A Pearson correlation test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Pearson r, three decimals.
    pub coefficient: f64,
    /// Two-sided p-value, four decimals.
    pub p_value: f64,
    /// `p_value < 0.05`.
    pub significant: bool,
}

/// Violation rates on days at or above a rainfall threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStats {
    /// Days at or above the threshold.
    pub days: usize,
    /// Days below the threshold.
    pub days_below: usize,
    /// Mean violations per day at or above the threshold.
    pub avg_violations: f64,
    /// Mean above divided by mean below (floored at 0.01).
    pub relative_risk: f64,
}

/// Daily violations against daily precipitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCorrelation {
    /// Weather rows after joining violation counts.
    pub data_points: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation_correlation: Option<CorrelationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation_3day_correlation: Option<CorrelationResult>,
    /// Keyed `above_{threshold}_inches`.
    #[serde(default)]
    pub threshold_analysis: BTreeMap<String, ThresholdStats>,
}

/// Output of one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_incidents: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal: Option<TemporalPatterns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial: Option<SpatialPatterns>,
    /// Counts per severity level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<FrequencyTable>,
    /// Counts per violation type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<FrequencyTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_facility: Option<FacilityBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSummary>,
    #[serde(flatten)]
    pub repeat_violators: Option<RepeatViolatorSummary>,
    #[serde(flatten)]
    pub weather_correlation: Option<WeatherCorrelation>,
}

impl AnalysisResult {
    /// A result carrying only an error message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Violation totals across the fetched data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationTotals {
    pub total: usize,
    pub unique_facilities: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_severity: Option<FrequencyTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_type: Option<FrequencyTable>,
}

/// County demographics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub population: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_household_income: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poverty_rate: Option<f64>,
}

/// Per-resident rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerCapita {
    pub violations_per_100k: f64,
}

/// Overview across every fetched dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<ViolationTotals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<Demographics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_capita: Option<PerCapita>,
}
