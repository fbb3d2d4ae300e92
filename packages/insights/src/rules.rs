//! Template insights, one rule set per query type.
//!
//! Each rule reads only the facets it needs and skips a finding when its
//! facet is absent.

use climatebud_analytics_models::{AnalysisResult, Severity, Trend};
use climatebud_geography_models::ResolvedLocation;
use climatebud_query_models::QueryType;

use crate::{Insight, InsightRenderer};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Threshold relative risk worth calling out.
const NOTABLE_RELATIVE_RISK: f64 = 1.5;

/// Correlation strength worth calling out.
const NOTABLE_CORRELATION: f64 = 0.2;

const SPILL_RECOMMENDATIONS: &[&str] = &[
    "Monitor facilities with multiple incidents more closely",
    "Consider increased inspections during peak incident months",
    "Review infrastructure maintenance schedules for problem areas",
];

const TREND_RECOMMENDATIONS: &[&str] = &[
    "Track monthly incident counts against this baseline",
    "Investigate what changed in years with unusually many incidents",
    "Schedule inspections ahead of historically busy months",
];

const VIOLATOR_RECOMMENDATIONS: &[&str] = &[
    "Prioritize infrastructure upgrades for chronic violators",
    "Implement enhanced monitoring for repeat offenders",
    "Consider enforcement actions for non-responsive facilities",
    "Evaluate capacity issues at high-violation facilities",
];

const WEATHER_RECOMMENDATIONS: &[&str] = &[
    "Increase monitoring during heavy rainfall events",
    "Consider infrastructure upgrades for wet weather capacity",
    "Develop rainfall-triggered inspection protocols",
    "Invest in stormwater management improvements",
];

const FACILITY_RECOMMENDATIONS: &[&str] = &[
    "Check the compliance history of facilities in the largest cluster",
    "Compare permit limits for the most-cited facilities",
];

const OVERVIEW_RECOMMENDATIONS: &[&str] = &[
    "Review specific analysis types for detailed insights",
    "Monitor facilities with compliance issues",
];

/// Deterministic insight templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedRenderer;

impl RuleBasedRenderer {
    /// Synchronous form of [`InsightRenderer::render`].
    #[must_use]
    pub fn insight(
        analysis: &AnalysisResult,
        query_type: QueryType,
        location: &ResolvedLocation,
    ) -> Insight {
        let mut insight = match query_type {
            QueryType::SpillAnalysis => spill_insight(analysis, location),
            QueryType::ViolationTrends => trend_insight(analysis, location),
            QueryType::RepeatViolators => violator_insight(analysis, location),
            QueryType::WeatherCorrelation => weather_insight(analysis, location),
            QueryType::FacilitySearch => facility_insight(analysis, location),
            QueryType::GeneralOverview => overview_insight(analysis, location),
        };

        if let Some(error) = &analysis.error {
            insight.concerns.push(format!("Analysis incomplete: {error}"));
        }

        insight
    }

    /// Synchronous form of [`InsightRenderer::report_summary`].
    #[must_use]
    pub fn summary(analysis: &AnalysisResult, location: &ResolvedLocation) -> String {
        let incidents = analysis
            .total_incidents
            .map_or_else(|| "multiple".to_string(), |n| n.to_string());
        let county = &location.county;
        let state = &location.state;

        format!(
            "Environmental Analysis Summary for {county} County, {state}\n\n\
             This report analyzes environmental compliance data including facility violations, \
             sewage spills, and related incidents. The analysis covers {incidents} recorded \
             incidents in the study period.\n\n\
             Key areas examined include violation patterns, repeat offenders, and correlations \
             with weather events. The findings highlight opportunities for improved monitoring \
             and infrastructure investment.\n\n\
             For detailed findings and recommendations, please review the specific analysis \
             sections of this report."
        )
    }
}

#[async_trait::async_trait]
impl InsightRenderer for RuleBasedRenderer {
    async fn render(
        &self,
        analysis: &AnalysisResult,
        query_type: QueryType,
        location: &ResolvedLocation,
    ) -> Insight {
        Self::insight(analysis, query_type, location)
    }

    async fn report_summary(
        &self,
        analysis: &AnalysisResult,
        location: &ResolvedLocation,
    ) -> String {
        Self::summary(analysis, location)
    }
}

fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month.checked_sub(1)?).ok()?;
    MONTH_NAMES.get(index).copied()
}

fn recommendations(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// Adds the peak month and trend direction, when known.
fn add_temporal(analysis: &AnalysisResult, insight: &mut Insight) {
    let Some(temporal) = &analysis.temporal else {
        return;
    };

    if let Some(month) = month_name(temporal.peak_month) {
        insight
            .patterns
            .push(format!("Peak incidents occur in {month}"));
    }

    match temporal.trend {
        Trend::Increasing => {
            insight
                .patterns
                .push("Incident rate is trending upward".to_string());
            insight
                .concerns
                .push("Rising incident trend requires attention".to_string());
        }
        Trend::Decreasing => insight
            .patterns
            .push("Incident rate is trending downward".to_string()),
        Trend::Stable | Trend::InsufficientData => {}
    }
}

fn spill_insight(analysis: &AnalysisResult, location: &ResolvedLocation) -> Insight {
    let total = analysis.total_incidents.unwrap_or(0);
    let mut insight = Insight {
        summary: format!("Analysis found {total} environmental incidents in {location}."),
        context: format!(
            "These incidents can impact water quality and public health in {} County.",
            location.county
        ),
        recommendations: recommendations(SPILL_RECOMMENDATIONS),
        ..Insight::default()
    };

    if total > 0 {
        insight.key_findings.push(format!(
            "Total of {total} incidents recorded in the analysis period"
        ));
    }

    if let Some(by_facility) = &analysis.by_facility {
        if by_facility.repeat_violator_count > 0 {
            insight.key_findings.push(format!(
                "{} facilities have multiple incidents",
                by_facility.repeat_violator_count
            ));
        }
        if let Some((name, count)) = by_facility.top_violators.first() {
            insight
                .key_findings
                .push(format!("Highest: {name} with {count} incidents"));
        }
    }

    add_temporal(analysis, &mut insight);
    insight
}

fn trend_insight(analysis: &AnalysisResult, location: &ResolvedLocation) -> Insight {
    let total = analysis.total_incidents.unwrap_or(0);
    let period = analysis
        .date_range
        .map(|range| format!(" between {} and {}", range.start, range.end))
        .unwrap_or_default();

    let mut insight = Insight {
        summary: format!("{total} violations were recorded in {location}{period}."),
        context: "Year-over-year changes show whether compliance in the area is improving."
            .to_string(),
        recommendations: recommendations(TREND_RECOMMENDATIONS),
        ..Insight::default()
    };

    if total > 0 {
        insight
            .key_findings
            .push(format!("Total of {total} violations in the analysis period"));
    }

    if let Some(temporal) = &analysis.temporal {
        for (year, count) in &temporal.by_year {
            insight
                .key_findings
                .push(format!("{year}: {count} violations"));
        }
        if temporal.trend == Trend::InsufficientData {
            insight
                .patterns
                .push("Too few months of data to establish a trend".to_string());
        } else if temporal.trend == Trend::Stable {
            insight
                .patterns
                .push("Violation counts are stable over the period".to_string());
        }
    }

    add_temporal(analysis, &mut insight);
    insight
}

fn violator_insight(analysis: &AnalysisResult, location: &ResolvedLocation) -> Insight {
    let summary = analysis.repeat_violators.as_ref();
    let chronic = summary.map_or(0, |s| s.chronic_violators);
    let repeat = summary.map_or(0, |s| s.repeat_violators);

    let mut insight = Insight {
        summary: format!(
            "Analysis identified {chronic} chronic and {repeat} repeat violators in {} County.",
            location.county
        ),
        context: "Repeat violations often indicate systemic issues requiring infrastructure \
                  investment."
            .to_string(),
        recommendations: recommendations(VIOLATOR_RECOMMENDATIONS),
        ..Insight::default()
    };

    if chronic > 0 {
        insight.key_findings.push(format!(
            "{chronic} facilities with 10+ violations (chronic violators)"
        ));
        insight
            .concerns
            .push("Chronic violators need immediate intervention".to_string());
    }

    if repeat > 0 {
        insight
            .key_findings
            .push(format!("{repeat} facilities with 3-9 violations"));
    }

    if let Some(top) = summary.and_then(|s| s.top_violators.first()) {
        insight.key_findings.push(format!(
            "Top violator: {} with {} violations",
            top.facility_name, top.violation_count
        ));
    }

    if let Some(frequent) = summary.and_then(|s| s.highest_frequency.first()) {
        insight.patterns.push(format!(
            "{} averages {} violations per year",
            frequent.facility_name, frequent.violations_per_year
        ));
    }

    insight
}

fn weather_insight(analysis: &AnalysisResult, location: &ResolvedLocation) -> Insight {
    let mut insight = Insight {
        summary: format!(
            "Analysis examined weather-related patterns in {} County violations.",
            location.county
        ),
        context: "Weather events, especially heavy rainfall, can overwhelm aging infrastructure."
            .to_string(),
        recommendations: recommendations(WEATHER_RECOMMENDATIONS),
        ..Insight::default()
    };

    let Some(correlation) = &analysis.weather_correlation else {
        return insight;
    };

    if let Some(daily) = &correlation.precipitation_correlation {
        if daily.significant && daily.coefficient > NOTABLE_CORRELATION {
            insight.key_findings.push(format!(
                "Significant correlation found (r={}) between rainfall and violations",
                daily.coefficient
            ));
            insight
                .patterns
                .push("Violations increase with precipitation".to_string());
            insight
                .concerns
                .push("Infrastructure may be vulnerable to wet weather".to_string());
        } else if daily.significant && daily.coefficient < -NOTABLE_CORRELATION {
            insight
                .key_findings
                .push("Violations decrease during rainy periods".to_string());
        } else {
            insight
                .key_findings
                .push("No strong correlation between rainfall and violations".to_string());
        }
    }

    if let Some(trailing) = &correlation.precipitation_3day_correlation
        && trailing.significant
        && trailing.coefficient > NOTABLE_CORRELATION
    {
        insight.key_findings.push(format!(
            "Rainfall over the previous three days also tracks violations (r={})",
            trailing.coefficient
        ));
    }

    for (key, stats) in &correlation.threshold_analysis {
        if stats.relative_risk > NOTABLE_RELATIVE_RISK {
            let inches = key.split('_').nth(1).unwrap_or(key);
            insight.patterns.push(format!(
                "Violation risk is {}x higher when rainfall exceeds {inches} inches",
                stats.relative_risk
            ));
        }
    }

    insight
}

fn facility_insight(analysis: &AnalysisResult, location: &ResolvedLocation) -> Insight {
    let facilities = analysis.by_facility.as_ref();
    let count = facilities.map_or(0, |f| f.total_facilities);

    let mut insight = Insight {
        summary: format!("Found {count} facilities with recorded violations in {location}."),
        context: "Facility locations show where enforcement and inspection effort is most needed."
            .to_string(),
        recommendations: recommendations(FACILITY_RECOMMENDATIONS),
        ..Insight::default()
    };

    if let Some((name, incidents)) = facilities.and_then(|f| f.top_violators.first()) {
        insight
            .key_findings
            .push(format!("{name} has the most violations ({incidents})"));
    }

    if let Some(hotspot) = analysis
        .spatial
        .as_ref()
        .and_then(|s| s.hotspots.first())
    {
        insight.patterns.push(format!(
            "Largest cluster: {} incidents near {:.3}, {:.3} ({})",
            hotspot.count, hotspot.lat, hotspot.lon, hotspot.name
        ));
    }

    insight
}

fn overview_insight(analysis: &AnalysisResult, location: &ResolvedLocation) -> Insight {
    let mut insight = Insight {
        summary: format!("Environmental overview for {location}."),
        context: "This overview provides a starting point for detailed environmental analysis."
            .to_string(),
        recommendations: recommendations(OVERVIEW_RECOMMENDATIONS),
        ..Insight::default()
    };

    if let Some(total) = analysis.total_incidents {
        insight
            .key_findings
            .push(format!("Total incidents analyzed: {total}"));
    }

    if let Some(range) = analysis.date_range {
        insight.key_findings.push(format!(
            "Records span {} to {}",
            range.start, range.end
        ));
    }

    if let Some(high) = analysis
        .severity
        .as_ref()
        .and_then(|s| s.get(Severity::High.as_ref()))
    {
        insight
            .key_findings
            .push(format!("{high} high-severity incidents"));
        insight
            .concerns
            .push(format!("{high} incidents were rated high severity"));
    }

    insight
}
