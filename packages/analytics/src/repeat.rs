//! Facility-level violation history and tiering.

use std::collections::HashMap;

use chrono::NaiveDate;
use climatebud_analytics_models::{
    AnalysisResult, FacilityProfile, FrequencyTable, RepeatViolatorSummary, ViolationRecord,
    ViolationTable, ViolatorCategory,
};

use crate::stats::round_to;

const MAX_TOP_VIOLATORS: usize = 10;
const MAX_HIGHEST_FREQUENCY: usize = 5;

/// Groups violations by facility and tiers each facility as chronic
/// (10 or more), repeat (3 to 9), or occasional.
///
/// Rows without a facility name are ignored.
#[must_use]
pub fn analyze_repeat_violators(violations: &ViolationTable) -> AnalysisResult {
    if violations.is_empty() || !violations.columns().facility_name {
        return AnalysisResult::error("No facility data available");
    }

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&ViolationRecord>> = HashMap::new();

    for record in violations.records() {
        let Some(name) = record.facility_name.as_deref() else {
            continue;
        };
        groups
            .entry(name)
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push(record);
    }

    let profiles: Vec<FacilityProfile> = order
        .iter()
        .filter_map(|name| groups.get(name).map(|rows| profile(name, rows)))
        .collect();

    let count_in = |category| profiles.iter().filter(|p| p.category == category).count();

    let mut top_violators = profiles.clone();
    top_violators.sort_by(|a, b| b.violation_count.cmp(&a.violation_count));
    top_violators.truncate(MAX_TOP_VIOLATORS);

    let mut highest_frequency = profiles.clone();
    highest_frequency.sort_by(|a, b| b.violations_per_year.total_cmp(&a.violations_per_year));
    highest_frequency.truncate(MAX_HIGHEST_FREQUENCY);

    log::debug!("Profiled {} facilities", profiles.len());

    AnalysisResult {
        repeat_violators: Some(RepeatViolatorSummary {
            total_facilities: profiles.len(),
            chronic_violators: count_in(ViolatorCategory::Chronic),
            repeat_violators: count_in(ViolatorCategory::Repeat),
            occasional_violators: count_in(ViolatorCategory::Occasional),
            top_violators,
            highest_frequency,
        }),
        ..AnalysisResult::default()
    }
}

#[allow(clippy::cast_precision_loss)]
fn profile(name: &str, rows: &[&ViolationRecord]) -> FacilityProfile {
    let dates: Vec<NaiveDate> = rows.iter().filter_map(|r| r.violation_date).collect();
    let first_violation = dates.iter().min().copied();
    let last_violation = dates.iter().max().copied();

    let active_days = match (first_violation, last_violation) {
        (Some(first), Some(last)) => (last - first).num_days(),
        _ => 0,
    };

    let primary_violation_type =
        FrequencyTable::from_values(rows.iter().filter_map(|r| r.violation_type.as_deref()))
            .first()
            .map_or_else(|| "Unknown".to_string(), |(t, _)| t.to_string());

    let (latitude, longitude) = rows
        .iter()
        .find_map(|r| r.coordinates())
        .map_or((None, None), |(lat, lon)| (Some(lat), Some(lon)));

    let violation_count = rows.len();
    let years = (active_days as f64 / 365.0).max(1.0);

    FacilityProfile {
        facility_name: name.to_string(),
        violation_count,
        first_violation,
        last_violation,
        primary_violation_type,
        latitude,
        longitude,
        active_days,
        violations_per_year: round_to(violation_count as f64 / years, 2),
        category: ViolatorCategory::from_count(violation_count),
    }
}
