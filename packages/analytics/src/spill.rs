//! Spill and violation pattern analysis: when, where, how severe, and
//! which facilities.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use climatebud_analytics_models::{
    AnalysisResult, Coordinates, DateRange, FacilityBreakdown, FrequencyTable, Hotspot,
    PrecipitationRecord, SpatialPatterns, TemporalPatterns, Trend, ViolationRecord,
    ViolationTable,
};

use crate::stats;
use crate::summary::weather_summary;

/// Hotspots reported at most.
const MAX_HOTSPOTS: usize = 5;

/// Facilities listed in the breakdown at most.
const MAX_TOP_FACILITIES: usize = 10;

/// Significance level for calling a trend.
const TREND_ALPHA: f64 = 0.05;

/// Analyzes violation patterns.
///
/// Facets are added according to the columns `violations` carries. When a
/// non-empty `weather` table is given, a rainfall summary is attached as
/// well.
#[must_use]
pub fn analyze_spill_patterns(
    violations: &ViolationTable,
    weather: Option<&[PrecipitationRecord]>,
) -> AnalysisResult {
    if violations.is_empty() {
        return AnalysisResult::error("No violation data available");
    }

    let records = violations.records();
    let columns = violations.columns();
    let dates: Vec<NaiveDate> = records.iter().filter_map(|r| r.violation_date).collect();

    let mut result = AnalysisResult {
        total_incidents: Some(records.len()),
        date_range: date_range(&dates),
        ..AnalysisResult::default()
    };

    if columns.violation_date {
        result.temporal = temporal_patterns(&dates);
    }

    if columns.coordinates {
        result.spatial = Some(spatial_patterns(records));
    }

    if columns.severity {
        result.severity = Some(FrequencyTable::from_values(
            records.iter().filter_map(|r| r.severity.map(|s| s.to_string())),
        ));
    }

    if columns.violation_type {
        result.types = Some(FrequencyTable::from_values(
            records.iter().filter_map(|r| r.violation_type.as_deref()),
        ));
    }

    if columns.facility_name {
        result.by_facility = Some(facility_breakdown(records));
    }

    if let Some(weather) = weather.filter(|w| !w.is_empty()) {
        result.weather = weather_summary(weather);
    }

    log::debug!(
        "Spill patterns over {} incidents ({} dated)",
        records.len(),
        dates.len()
    );

    result
}

fn date_range(dates: &[NaiveDate]) -> Option<DateRange> {
    let start = dates.iter().min()?;
    let end = dates.iter().max()?;
    Some(DateRange {
        start: *start,
        end: *end,
    })
}

fn temporal_patterns(dates: &[NaiveDate]) -> Option<TemporalPatterns> {
    if dates.is_empty() {
        return None;
    }

    let mut by_month: BTreeMap<u32, usize> = BTreeMap::new();
    let mut by_year: BTreeMap<i32, usize> = BTreeMap::new();
    let mut by_quarter: BTreeMap<u32, usize> = BTreeMap::new();

    for date in dates {
        *by_month.entry(date.month()).or_default() += 1;
        *by_year.entry(date.year()).or_default() += 1;
        *by_quarter.entry((date.month() - 1) / 3 + 1).or_default() += 1;
    }

    let mut peak_month = 0;
    let mut peak_count = 0;
    for (&month, &count) in &by_month {
        if count > peak_count {
            peak_month = month;
            peak_count = count;
        }
    }

    Some(TemporalPatterns {
        by_month,
        by_year,
        by_quarter,
        peak_month,
        trend: monthly_trend(dates),
    })
}

/// Fits a line through incident counts per calendar month (months without
/// incidents are not buckets).
#[allow(clippy::cast_precision_loss)]
pub(crate) fn monthly_trend(dates: &[NaiveDate]) -> Trend {
    let mut buckets: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for date in dates {
        *buckets.entry((date.year(), date.month())).or_default() += 1;
    }

    if buckets.len() < 3 {
        return Trend::InsufficientData;
    }

    let x: Vec<f64> = (0..buckets.len()).map(|i| i as f64).collect();
    let y: Vec<f64> = buckets.values().map(|&c| c as f64).collect();

    match stats::linear_regression(&x, &y) {
        Some(fit) if fit.p_value <= TREND_ALPHA => {
            if fit.slope > 0.0 {
                Trend::Increasing
            } else {
                Trend::Decreasing
            }
        }
        _ => Trend::Stable,
    }
}

struct Bin {
    lat_sum: f64,
    lon_sum: f64,
    count: usize,
    name: Option<String>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn spatial_patterns(records: &[ViolationRecord]) -> SpatialPatterns {
    let located: Vec<(&ViolationRecord, (f64, f64))> = records
        .iter()
        .filter_map(|r| r.coordinates().map(|c| (r, c)))
        .collect();

    if located.len() < 2 {
        return SpatialPatterns::default();
    }

    let lats: Vec<f64> = located.iter().map(|(_, (lat, _))| *lat).collect();
    let lons: Vec<f64> = located.iter().map(|(_, (_, lon))| *lon).collect();
    let center = Coordinates {
        lat: stats::mean(&lats).unwrap_or_default(),
        lon: stats::mean(&lons).unwrap_or_default(),
    };

    let distances: Vec<f64> = located
        .iter()
        .map(|(_, (lat, lon))| (lat - center.lat).hypot(lon - center.lon))
        .collect();

    let mut index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut bins: Vec<Bin> = Vec::new();

    for (record, (lat, lon)) in &located {
        let key = ((lat * 100.0).round() as i64, (lon * 100.0).round() as i64);
        let i = *index.entry(key).or_insert_with(|| {
            bins.push(Bin {
                lat_sum: 0.0,
                lon_sum: 0.0,
                count: 0,
                name: None,
            });
            bins.len() - 1
        });

        let bin = &mut bins[i];
        bin.lat_sum += lat;
        bin.lon_sum += lon;
        bin.count += 1;
        if bin.name.is_none() {
            bin.name.clone_from(&record.facility_name);
        }
    }

    bins.sort_by(|a, b| b.count.cmp(&a.count));

    let hotspots = bins
        .into_iter()
        .take(MAX_HOTSPOTS)
        .map(|bin| Hotspot {
            lat: bin.lat_sum / bin.count as f64,
            lon: bin.lon_sum / bin.count as f64,
            count: bin.count,
            name: bin.name.unwrap_or_else(|| "Unknown".to_string()),
        })
        .collect();

    SpatialPatterns {
        center: Some(center),
        spread: stats::sample_std_dev(&distances),
        hotspots,
    }
}

fn facility_breakdown(records: &[ViolationRecord]) -> FacilityBreakdown {
    let counts =
        FrequencyTable::from_values(records.iter().filter_map(|r| r.facility_name.as_deref()));

    let single = counts.entries().iter().filter(|(_, c)| *c == 1).count();
    let repeat = counts.entries().iter().filter(|(_, c)| *c > 1).count();

    FacilityBreakdown {
        total_facilities: counts.len(),
        single_incident_facilities: single,
        repeat_violator_count: repeat,
        top_violators: counts.truncated(MAX_TOP_FACILITIES),
    }
}
