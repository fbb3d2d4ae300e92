//! Field parsing shared by the CSV loaders.
//!
//! Every parser takes the raw cell text and returns `None` for blank or
//! malformed values, so one bad cell never drops a row.

use chrono::{NaiveDate, NaiveDateTime};
use climatebud_geography_models::fips;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Returns the trimmed cell, or `None` when blank.
#[must_use]
pub fn non_blank(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|c| !c.is_empty())
}

/// Parses a calendar date. Accepts ISO dates, US-style `m/d/Y`, and ISO
/// datetimes with the time discarded.
#[must_use]
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(cell, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(cell, format).ok())
                .map(|dt| dt.date())
        })
}

/// Parses a finite number, ignoring thousands separators.
#[must_use]
pub fn parse_f64(cell: &str) -> Option<f64> {
    cell.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parses a non-negative count, ignoring thousands separators.
#[must_use]
pub fn parse_u64(cell: &str) -> Option<u64> {
    cell.trim().replace(',', "").parse().ok()
}

/// Parses a coordinate pair. Returns `None` if either value is missing,
/// unparseable, or zero.
#[must_use]
pub fn parse_lat_lng(lat: Option<&str>, lng: Option<&str>) -> Option<(f64, f64)> {
    let latitude = parse_f64(lat?)?;
    let longitude = parse_f64(lng?)?;
    if latitude == 0.0 || longitude == 0.0 {
        return None;
    }
    Some((latitude, longitude))
}

/// Whether a state cell names `state` (a two-letter abbreviation), by
/// abbreviation or full name.
#[must_use]
pub fn state_matches(cell: &str, state: &str) -> bool {
    let cell = cell.trim();
    cell.eq_ignore_ascii_case(state)
        || fips::by_name(cell).is_some_and(|info| info.abbr.eq_ignore_ascii_case(state))
}

/// Whether a county cell names `county`, with or without a trailing
/// "County".
#[must_use]
pub fn county_matches(cell: &str, county: &str) -> bool {
    strip_county(cell).eq_ignore_ascii_case(strip_county(county))
}

fn strip_county(name: &str) -> &str {
    let name = name.trim();
    let split = name.len().saturating_sub(" county".len());
    match (name.get(..split), name.get(split..)) {
        (Some(head), Some(tail)) if tail.eq_ignore_ascii_case(" county") => head.trim_end(),
        _ => name,
    }
}
