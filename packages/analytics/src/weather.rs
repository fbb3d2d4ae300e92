//! Violations versus precipitation.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use climatebud_analytics_models::{
    AnalysisResult, CorrelationResult, PrecipitationRecord, ThresholdStats, ViolationTable,
    WeatherCorrelation,
};

use crate::stats::{self, round_to};

/// Rainfall thresholds in inches.
const THRESHOLDS: [f64; 4] = [0.1, 0.5, 1.0, 2.0];

/// Paired days needed before a correlation is reported.
const MIN_CORRELATION_DAYS: usize = 11;

/// Width of the trailing rainfall window, in rows.
const ROLLING_WINDOW: usize = 3;

/// Floor on the below-threshold mean so relative risk stays finite.
const RISK_FLOOR: f64 = 0.01;

const SIGNIFICANCE: f64 = 0.05;

/// One weather row with the violations recorded that day.
struct DailyRow {
    precipitation: Option<f64>,
    violations: f64,
}

/// Correlates daily violation counts with daily precipitation.
///
/// Counts are joined onto the weather rows, so days without violations
/// count as zero and violations on days without weather are dropped.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn analyze_weather_correlation(
    violations: &ViolationTable,
    weather: &[PrecipitationRecord],
) -> AnalysisResult {
    if violations.is_empty() || weather.is_empty() {
        return AnalysisResult::error("Insufficient data for correlation analysis");
    }

    let mut daily: HashMap<NaiveDate, usize> = HashMap::new();
    for date in violations.records().iter().filter_map(|r| r.violation_date) {
        *daily.entry(date).or_default() += 1;
    }

    let rows: Vec<DailyRow> = weather
        .iter()
        .map(|w| DailyRow {
            precipitation: w.precipitation_inches.filter(|p| p.is_finite()),
            violations: daily.get(&w.date).copied().unwrap_or_default() as f64,
        })
        .collect();

    let same_day = correlate(rows.iter().map(|r| (r.precipitation, r.violations)));

    let trailing = same_day.and_then(|_| {
        let sums = rolling_sums(&rows);
        correlate(sums.into_iter().zip(rows.iter().map(|r| r.violations)))
    });

    log::debug!(
        "Weather correlation over {} days ({} with violations)",
        rows.len(),
        daily.len()
    );

    AnalysisResult {
        weather_correlation: Some(WeatherCorrelation {
            data_points: rows.len(),
            precipitation_correlation: same_day,
            precipitation_3day_correlation: trailing,
            threshold_analysis: threshold_analysis(&rows),
        }),
        ..AnalysisResult::default()
    }
}

fn correlate(pairs: impl Iterator<Item = (Option<f64>, f64)>) -> Option<CorrelationResult> {
    let (x, y): (Vec<f64>, Vec<f64>) = pairs.filter_map(|(p, v)| p.map(|p| (p, v))).unzip();

    if x.len() < MIN_CORRELATION_DAYS {
        return None;
    }

    let correlation = stats::pearson(&x, &y)?;

    Some(CorrelationResult {
        coefficient: round_to(correlation.r, 3),
        p_value: round_to(correlation.p_value, 4),
        significant: correlation.p_value < SIGNIFICANCE,
    })
}

/// Trailing sums over the last three rows; `None` until the window is full
/// or when any value in it is missing.
fn rolling_sums(rows: &[DailyRow]) -> Vec<Option<f64>> {
    (0..rows.len())
        .map(|i| {
            if i + 1 < ROLLING_WINDOW {
                return None;
            }
            rows[i + 1 - ROLLING_WINDOW..=i]
                .iter()
                .map(|r| r.precipitation)
                .sum::<Option<f64>>()
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn threshold_analysis(rows: &[DailyRow]) -> BTreeMap<String, ThresholdStats> {
    let mut analysis = BTreeMap::new();

    for threshold in THRESHOLDS {
        let (above, below): (Vec<&DailyRow>, Vec<&DailyRow>) = rows
            .iter()
            .filter(|r| r.precipitation.is_some())
            .partition(|r| r.precipitation.is_some_and(|p| p >= threshold));

        if above.is_empty() || below.is_empty() {
            continue;
        }

        let mean_above = above.iter().map(|r| r.violations).sum::<f64>() / above.len() as f64;
        let mean_below = below.iter().map(|r| r.violations).sum::<f64>() / below.len() as f64;

        analysis.insert(
            format!("above_{threshold:.1}_inches"),
            ThresholdStats {
                days: above.len(),
                days_below: below.len(),
                avg_violations: round_to(mean_above, 2),
                relative_risk: round_to(mean_above / mean_below.max(RISK_FLOOR), 2),
            },
        );
    }

    analysis
}

#[cfg(test)]
mod tests {
    use chrono::Days;
    use climatebud_analytics_models::ViolationRecord;

    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn weather(values: &[Option<f64>]) -> Vec<PrecipitationRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, &p)| PrecipitationRecord {
                date: start() + Days::new(i as u64),
                precipitation_inches: p,
                station: Some("USW00013894".to_string()),
            })
            .collect()
    }

    fn violations_on(day_counts: &[(u64, usize)]) -> ViolationTable {
        let mut records = Vec::new();
        for &(day, n) in day_counts {
            for _ in 0..n {
                records.push(ViolationRecord {
                    facility_name: Some("Plant".to_string()),
                    violation_date: Some(start() + Days::new(day)),
                    ..ViolationRecord::default()
                });
            }
        }
        ViolationTable::from_records(records)
    }

    fn correlation(result: AnalysisResult) -> WeatherCorrelation {
        result.weather_correlation.unwrap()
    }

    #[test]
    fn empty_inputs_are_errors() {
        let w = weather(&[Some(0.2)]);
        let result = analyze_weather_correlation(&ViolationTable::default(), &w);
        assert_eq!(
            result.error.as_deref(),
            Some("Insufficient data for correlation analysis")
        );
        let result = analyze_weather_correlation(&violations_on(&[(0, 1)]), &[]);
        assert!(result.is_error());
    }

    #[test]
    fn ten_days_have_no_correlation() {
        let values: Vec<_> = (0..10).map(|i| Some(f64::from(i) * 0.3)).collect();
        let result = analyze_weather_correlation(
            &violations_on(&[(2, 1), (5, 2), (9, 3)]),
            &weather(&values),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["data_points"], 10);
        assert!(json.get("precipitation_correlation").is_none());
        assert!(json.get("precipitation_3day_correlation").is_none());
    }

    #[test]
    fn rain_drives_violations() {
        let values: Vec<_> = (0..20)
            .map(|i| Some(if i % 4 == 0 { 1.5 } else { 0.0 }))
            .collect();
        let days: Vec<(u64, usize)> = (0..20).filter(|i| i % 4 == 0).map(|i| (i, 2)).collect();
        let result = analyze_weather_correlation(&violations_on(&days), &weather(&values));
        let analysis = correlation(result);

        assert_eq!(analysis.data_points, 20);
        let daily = analysis.precipitation_correlation.unwrap();
        assert!((daily.coefficient - 1.0).abs() < 1e-9);
        assert!(daily.significant);
        assert!(analysis.precipitation_3day_correlation.is_some());

        let heavy = &analysis.threshold_analysis["above_1.0_inches"];
        assert_eq!(heavy.days, 5);
        assert_eq!(heavy.days_below, 15);
        assert!((heavy.avg_violations - 2.0).abs() < 1e-9);
        // Zero violations below the threshold hits the 0.01 floor.
        assert!((heavy.relative_risk - 200.0).abs() < 1e-9);
        assert!(heavy.relative_risk > 1.0);

        // Nobody got two inches of rain.
        assert!(!analysis.threshold_analysis.contains_key("above_2.0_inches"));
        assert!(analysis.threshold_analysis.contains_key("above_0.1_inches"));
    }

    #[test]
    fn constant_rain_skips_correlation() {
        let values = vec![Some(0.4); 15];
        let result =
            analyze_weather_correlation(&violations_on(&[(1, 1), (3, 4)]), &weather(&values));
        let analysis = correlation(result);
        assert!(analysis.precipitation_correlation.is_none());
        // Every day is above 0.1 and none below it.
        assert!(analysis.threshold_analysis.is_empty());
    }

    #[test]
    fn missing_precipitation_is_excluded() {
        let mut values: Vec<_> = (0..14).map(|i| Some(f64::from(i % 3))).collect();
        values[4] = None;
        values[9] = None;
        let result =
            analyze_weather_correlation(&violations_on(&[(2, 3), (5, 2), (8, 4)]), &weather(&values));
        let analysis = correlation(result);
        assert_eq!(analysis.data_points, 14);
        // 12 valid days remain.
        assert!(analysis.precipitation_correlation.is_some());
        let above = &analysis.threshold_analysis["above_0.1_inches"];
        assert_eq!(above.days + above.days_below, 12);
    }

    #[test]
    fn rolling_window_requires_complete_values() {
        let rows: Vec<DailyRow> = [Some(1.0), Some(2.0), Some(3.0), None, Some(1.0), Some(1.0), Some(1.0)]
            .into_iter()
            .map(|p| DailyRow {
                precipitation: p,
                violations: 0.0,
            })
            .collect();
        let sums = rolling_sums(&rows);
        assert_eq!(
            sums,
            vec![None, None, Some(6.0), None, None, None, Some(3.0)]
        );
    }
}
