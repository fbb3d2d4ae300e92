//! Best-effort extraction of location and time window from free text.
//!
//! Nothing here fails: text that names no place or period resolves to the
//! configured default location and the default lookback window.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use climatebud_config::DefaultsConfig;
use climatebud_geography_models::fips::{self, STATES};
use climatebud_geography_models::{Location, ResolvedLocation};
use climatebud_query_models::TimeRange;
use regex::Regex;

static STATE_ABBR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2})\b").unwrap_or_else(|_| unreachable!()));

static COUNTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\w+)\s+county").unwrap_or_else(|_| unreachable!()));

static LAST_PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:last|past)\s+(?:(\d+)\s+)?(year|month|week)s?\b")
        .unwrap_or_else(|_| unreachable!())
});

static COUNTED_PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(year|month|week)s?\b").unwrap_or_else(|_| unreachable!())
});

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").unwrap_or_else(|_| unreachable!()));

static FIRST_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").unwrap_or_else(|_| unreachable!()));

/// Words that can precede "county" without naming one ("in my county").
const COUNTY_STOPWORDS: &[&str] = &[
    "a", "any", "each", "every", "my", "our", "per", "that", "the", "this", "which", "your",
];

/// Resolves locations and time windows, falling back to configured
/// defaults.
#[derive(Debug, Clone)]
pub struct LocationTimeResolver {
    defaults: DefaultsConfig,
}

impl LocationTimeResolver {
    #[must_use]
    pub const fn new(defaults: DefaultsConfig) -> Self {
        Self { defaults }
    }

    /// The defaults this resolver falls back to.
    #[must_use]
    pub const fn defaults(&self) -> &DefaultsConfig {
        &self.defaults
    }

    /// Extracts a location from `text` and fills missing parts from the
    /// defaults.
    #[must_use]
    pub fn resolve_location(&self, text: &str) -> ResolvedLocation {
        self.complete_location(extract_location(text))
    }

    /// Fills missing state and county of `location` from the defaults.
    #[must_use]
    pub fn complete_location(&self, location: Location) -> ResolvedLocation {
        location.resolve(&self.defaults.state, &self.defaults.county)
    }

    /// Extracts a time window from `text`, or the default window ending
    /// `today` when the text names none.
    #[must_use]
    pub fn resolve_time_range(&self, text: &str, today: NaiveDate) -> TimeRange {
        extract_time_range(text, today).unwrap_or_else(|| self.default_time_range(today))
    }

    /// The last `lookback_years` years ending `today`.
    #[must_use]
    pub fn default_time_range(&self, today: NaiveDate) -> TimeRange {
        let days = u64::from(self.defaults.lookback_years).saturating_mul(365);
        TimeRange::new(days_before(today, days), today)
    }
}

/// Extracts whatever state and county `text` names, without defaults.
///
/// A whole-word full state name wins (the longest one, so "West Virginia"
/// is not read as "Virginia"). Without one, the first uppercase two-letter
/// token that is a real state abbreviation is used. The county is the word
/// before "county", title-cased.
#[must_use]
pub fn extract_location(text: &str) -> Location {
    let state = state_from_name(text).or_else(|| {
        STATE_ABBR_RE
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .find(|abbr| fips::is_state_abbr(abbr))
    });

    let county = COUNTY_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_lowercase())
        .find(|word| !COUNTY_STOPWORDS.contains(&word.as_str()))
        .map(|word| title_case(&word));

    Location {
        state,
        county,
        city: None,
    }
}

fn state_from_name(text: &str) -> Option<String> {
    let lower = text.to_lowercase();

    STATES
        .iter()
        .filter(|state| contains_whole_word(&lower, state.name))
        .max_by_key(|state| state.name.len())
        .map(|state| state.abbr.to_string())
}

fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Extracts a time window from `text`, if it names one.
///
/// "last/past [N] years|months|weeks" and "N years|months|weeks" become
/// the window of 365, 30, or 7 days per unit ending `today`. A bare
/// four-digit year becomes that calendar year. A relative phrase wins over
/// a year.
#[must_use]
pub fn extract_time_range(text: &str, today: NaiveDate) -> Option<TimeRange> {
    if let Some(caps) = LAST_PERIOD_RE.captures(text) {
        let count = caps.get(1).map_or(1, |m| parse_count(m.as_str()));
        return Some(window(today, count, &caps[2]));
    }

    if let Some(caps) = COUNTED_PERIOD_RE.captures(text) {
        return Some(window(today, parse_count(&caps[1]), &caps[2]));
    }

    YEAR_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<i32>().ok())
        .find_map(calendar_year)
}

/// Converts a relative phrase such as `"last 3 years"` or `"past month"`
/// to a window ending `today`.
///
/// The unit is the first of year, month, or week the phrase mentions; the
/// count is the first number in it, defaulting to 1. Returns `None` when
/// the phrase names no unit.
#[must_use]
pub fn parse_relative_time(phrase: &str, today: NaiveDate) -> Option<TimeRange> {
    let lower = phrase.to_lowercase();
    let unit = ["year", "month", "week"]
        .into_iter()
        .find(|unit| lower.contains(unit))?;
    let count = FIRST_NUMBER_RE
        .find(&lower)
        .map_or(1, |m| parse_count(m.as_str()));

    Some(window(today, count, unit))
}

/// Normalizes a state abbreviation or full state name to the uppercase
/// two-letter abbreviation.
#[must_use]
pub fn normalize_state(text: &str) -> Option<String> {
    let text = text.trim();
    fips::by_abbr(text)
        .or_else(|| fips::by_name(text))
        .map(|state| state.abbr.to_string())
}

fn window(today: NaiveDate, count: u64, unit: &str) -> TimeRange {
    let per_unit: u64 = match unit.to_lowercase().as_str() {
        "month" => 30,
        "week" => 7,
        _ => 365,
    };
    TimeRange::new(days_before(today, count.saturating_mul(per_unit)), today)
}

fn parse_count(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

fn days_before(today: NaiveDate, days: u64) -> NaiveDate {
    today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

fn calendar_year(year: i32) -> Option<TimeRange> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)?;
    Some(TimeRange::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolver() -> LocationTimeResolver {
        LocationTimeResolver::new(DefaultsConfig::default())
    }

    #[test]
    fn state_from_full_name() {
        let loc = extract_location("Spills in florida last year");
        assert_eq!(loc.state.as_deref(), Some("FL"));
    }

    #[test]
    fn longest_state_name_wins() {
        let loc = extract_location("violations across West Virginia");
        assert_eq!(loc.state.as_deref(), Some("WV"));
        let loc = extract_location("violations across Virginia");
        assert_eq!(loc.state.as_deref(), Some("VA"));
    }

    #[test]
    fn state_name_must_be_whole_word() {
        // "kansas" appears inside "arkansas" but only Arkansas is named.
        let loc = extract_location("facilities in arkansas");
        assert_eq!(loc.state.as_deref(), Some("AR"));
    }

    #[test]
    fn state_from_abbreviation_when_no_name() {
        let loc = extract_location("Show spills near Houston TX");
        assert_eq!(loc.state.as_deref(), Some("TX"));
        // "SSO" is three letters and "ZZ" is not a state.
        let loc = extract_location("SSO events ZZ");
        assert_eq!(loc.state, None);
    }

    #[test]
    fn name_beats_abbreviation() {
        let loc = extract_location("Compare Georgia with FL");
        assert_eq!(loc.state.as_deref(), Some("GA"));
    }

    #[test]
    fn county_is_title_cased() {
        let loc = extract_location("sewage spills in BALDWIN county");
        assert_eq!(loc.county.as_deref(), Some("Baldwin"));
    }

    #[test]
    fn county_skips_non_names() {
        let loc = extract_location("an overview of my county");
        assert_eq!(loc.county, None);
        let loc = extract_location("which county near Mobile County has spills");
        assert_eq!(loc.county.as_deref(), Some("Mobile"));
    }

    #[test]
    fn resolve_location_defaults() {
        let loc = resolver().resolve_location("what is happening?");
        assert_eq!(loc.state, "AL");
        assert_eq!(loc.county, "Baldwin");
    }

    #[test]
    fn relative_years() {
        let today = date(2025, 6, 15);
        let range = extract_time_range("over the last 3 years", today).unwrap();
        assert_eq!(range.end_date(), today);
        assert_eq!(range.start_date(), today - Days::new(365 * 3));
    }

    #[test]
    fn relative_without_count() {
        let today = date(2025, 6, 15);
        let range = extract_time_range("in the past month", today).unwrap();
        assert_eq!(range.start_date(), today - Days::new(30));
        let range = extract_time_range("during the last week", today).unwrap();
        assert_eq!(range.start_date(), today - Days::new(7));
    }

    #[test]
    fn counted_period() {
        let today = date(2025, 6, 15);
        let range = extract_time_range("trends over 2 years", today).unwrap();
        assert_eq!(range.start_date(), today - Days::new(730));
    }

    #[test]
    fn bare_year_is_calendar_year() {
        let range = extract_time_range("spills in 2022", date(2025, 6, 15)).unwrap();
        assert_eq!(range.start_date(), date(2022, 1, 1));
        assert_eq!(range.end_date(), date(2022, 12, 31));
    }

    #[test]
    fn relative_phrase_beats_year() {
        let today = date(2025, 6, 15);
        let range = extract_time_range("since 2020, the last 2 years", today).unwrap();
        assert_eq!(range.end_date(), today);
        assert_eq!(range.start_date(), today - Days::new(730));
    }

    #[test]
    fn default_window() {
        let today = date(2025, 6, 15);
        let range = resolver().resolve_time_range("anything at all", today);
        assert_eq!(range.start_date(), today - Days::new(1095));
        assert_eq!(range.end_date(), today);
    }

    #[test]
    fn huge_count_does_not_panic() {
        let today = date(2025, 6, 15);
        let range = extract_time_range("last 99999999999999999999 years", today).unwrap();
        assert_eq!(range.start_date(), NaiveDate::MIN);
        assert_eq!(range.end_date(), today);
    }

    #[test]
    fn parse_relative_phrases() {
        let today = date(2025, 6, 15);
        let range = parse_relative_time("Last 6 Months", today).unwrap();
        assert_eq!(range.start_date(), today - Days::new(180));
        let range = parse_relative_time("past year", today).unwrap();
        assert_eq!(range.start_date(), today - Days::new(365));
        assert!(parse_relative_time("recently", today).is_none());
    }

    #[test]
    fn normalizes_states() {
        assert_eq!(normalize_state("al").as_deref(), Some("AL"));
        assert_eq!(normalize_state(" Alabama ").as_deref(), Some("AL"));
        assert_eq!(normalize_state("new york").as_deref(), Some("NY"));
        assert_eq!(normalize_state("Atlantis"), None);
    }
}
