//! Cross-dataset overview.

use std::collections::HashSet;

use climatebud_analytics_models::{
    DatasetSummary, Datasets, Demographics, FrequencyTable, PerCapita, PrecipitationRecord,
    ViolationTable, ViolationTotals, WeatherSummary,
};

use crate::stats::{self, round_to};

/// Rainfall totals, or `None` when no day reported a value.
#[must_use]
pub fn weather_summary(weather: &[PrecipitationRecord]) -> Option<WeatherSummary> {
    let values: Vec<f64> = weather
        .iter()
        .filter_map(|w| w.precipitation_inches)
        .filter(|p| p.is_finite())
        .collect();

    let average = stats::mean(&values)?;

    Some(WeatherSummary {
        total_rainfall_inches: round_to(values.iter().sum(), 2),
        avg_daily_rainfall: round_to(average, 3),
        rainy_days: values.iter().filter(|&&p| p > 0.1).count(),
        heavy_rain_days: values.iter().filter(|&&p| p > 1.0).count(),
    })
}

/// Summarizes everything fetched for a query: violation totals, rainfall,
/// demographics, and violations per 100k residents.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize_datasets(datasets: &Datasets) -> DatasetSummary {
    let violations = violation_totals(&datasets.violations);
    let weather = weather_summary(&datasets.precipitation);

    let population = datasets.population.first().and_then(|p| p.population);
    let income = datasets.income.first();

    let demographics = (!datasets.population.is_empty() || income.is_some()).then(|| Demographics {
        population,
        median_household_income: income.and_then(|i| i.median_household_income),
        poverty_rate: income.and_then(|i| i.poverty_rate),
    });

    let per_capita = match (&violations, population) {
        (Some(totals), Some(population)) if population > 0 => Some(PerCapita {
            violations_per_100k: round_to(
                totals.total as f64 / population as f64 * 100_000.0,
                2,
            ),
        }),
        _ => None,
    };

    DatasetSummary {
        violations,
        weather,
        demographics,
        per_capita,
    }
}

fn violation_totals(table: &ViolationTable) -> Option<ViolationTotals> {
    if table.is_empty() {
        return None;
    }

    let records = table.records();
    let columns = table.columns();

    let unique_facilities = records
        .iter()
        .filter_map(|r| r.facility_name.as_deref())
        .collect::<HashSet<_>>()
        .len();

    Some(ViolationTotals {
        total: records.len(),
        unique_facilities,
        by_severity: columns.severity.then(|| {
            FrequencyTable::from_values(
                records.iter().filter_map(|r| r.severity.map(|s| s.to_string())),
            )
        }),
        by_type: columns.violation_type.then(|| {
            FrequencyTable::from_values(records.iter().filter_map(|r| r.violation_type.as_deref()))
        }),
    })
}
