//! US state and county lookup tables.
//!
//! Provides mappings between full state names, two-letter abbreviations,
//! and two-digit FIPS codes for the 50 US states, plus five-digit county
//! FIPS codes for the counties the data sources are keyed on.

/// A single US state entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInfo {
    /// Lowercase full state name (e.g. `"new york"`).
    pub name: &'static str,
    /// Two-letter postal abbreviation (e.g. `"NY"`).
    pub abbr: &'static str,
    /// Two-digit FIPS code (e.g. `"36"`).
    pub fips: &'static str,
}

const fn state(name: &'static str, abbr: &'static str, fips: &'static str) -> StateInfo {
    StateInfo { name, abbr, fips }
}

/// The 50 US states in alphabetical order of their full names.
pub const STATES: &[StateInfo] = &[
    state("alabama", "AL", "01"),
    state("alaska", "AK", "02"),
    state("arizona", "AZ", "04"),
    state("arkansas", "AR", "05"),
    state("california", "CA", "06"),
    state("colorado", "CO", "08"),
    state("connecticut", "CT", "09"),
    state("delaware", "DE", "10"),
    state("florida", "FL", "12"),
    state("georgia", "GA", "13"),
    state("hawaii", "HI", "15"),
    state("idaho", "ID", "16"),
    state("illinois", "IL", "17"),
    state("indiana", "IN", "18"),
    state("iowa", "IA", "19"),
    state("kansas", "KS", "20"),
    state("kentucky", "KY", "21"),
    state("louisiana", "LA", "22"),
    state("maine", "ME", "23"),
    state("maryland", "MD", "24"),
    state("massachusetts", "MA", "25"),
    state("michigan", "MI", "26"),
    state("minnesota", "MN", "27"),
    state("mississippi", "MS", "28"),
    state("missouri", "MO", "29"),
    state("montana", "MT", "30"),
    state("nebraska", "NE", "31"),
    state("nevada", "NV", "32"),
    state("new hampshire", "NH", "33"),
    state("new jersey", "NJ", "34"),
    state("new mexico", "NM", "35"),
    state("new york", "NY", "36"),
    state("north carolina", "NC", "37"),
    state("north dakota", "ND", "38"),
    state("ohio", "OH", "39"),
    state("oklahoma", "OK", "40"),
    state("oregon", "OR", "41"),
    state("pennsylvania", "PA", "42"),
    state("rhode island", "RI", "44"),
    state("south carolina", "SC", "45"),
    state("south dakota", "SD", "46"),
    state("tennessee", "TN", "47"),
    state("texas", "TX", "48"),
    state("utah", "UT", "49"),
    state("vermont", "VT", "50"),
    state("virginia", "VA", "51"),
    state("washington", "WA", "53"),
    state("west virginia", "WV", "54"),
    state("wisconsin", "WI", "55"),
    state("wyoming", "WY", "56"),
];

/// County FIPS codes keyed by `(state abbreviation, uppercase county name)`.
const COUNTY_FIPS: &[(&str, &str, &str)] = &[
    ("AL", "BALDWIN", "01003"),
    ("AL", "MOBILE", "01097"),
    ("CA", "LOS ANGELES", "06037"),
    ("CA", "SAN FRANCISCO", "06075"),
    ("FL", "MIAMI-DADE", "12086"),
    ("TX", "HARRIS", "48201"),
];

/// Fallback FIPS code used when neither the county nor the state resolves.
pub const FALLBACK_FIPS: &str = "01";

/// Looks up a state by its two-letter abbreviation (case-insensitive).
#[must_use]
pub fn by_abbr(abbr: &str) -> Option<&'static StateInfo> {
    STATES.iter().find(|s| s.abbr.eq_ignore_ascii_case(abbr))
}

/// Looks up a state by its full name (case-insensitive, surrounding
/// whitespace ignored).
#[must_use]
pub fn by_name(name: &str) -> Option<&'static StateInfo> {
    let name = name.trim();
    STATES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Returns `true` if `abbr` is exactly one of the 50 uppercase state
/// abbreviations.
#[must_use]
pub fn is_state_abbr(abbr: &str) -> bool {
    STATES.iter().any(|s| s.abbr == abbr)
}

/// Maps a two-letter state abbreviation to its FIPS code.
#[must_use]
pub fn state_fips(abbr: &str) -> Option<&'static str> {
    by_abbr(abbr).map(|s| s.fips)
}

/// Maps a state abbreviation and county name to a five-digit county FIPS
/// code.
#[must_use]
pub fn county_fips(state: &str, county: &str) -> Option<&'static str> {
    let state = state.to_uppercase();
    let county = county.trim().to_uppercase();
    COUNTY_FIPS
        .iter()
        .find(|(s, c, _)| *s == state && *c == county)
        .map(|(_, _, fips)| *fips)
}

/// Resolves the most specific FIPS code for a location: the county code
/// when known, otherwise the state code, otherwise [`FALLBACK_FIPS`].
#[must_use]
pub fn location_fips(state: &str, county: Option<&str>) -> &'static str {
    county
        .and_then(|c| county_fips(state, c))
        .or_else(|| state_fips(state))
        .unwrap_or(FALLBACK_FIPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_count() {
        assert_eq!(STATES.len(), 50);
    }

    #[test]
    fn abbr_roundtrip() {
        for s in STATES {
            assert_eq!(by_abbr(s.abbr), Some(s), "roundtrip failed for {}", s.abbr);
            assert_eq!(by_name(s.name), Some(s), "roundtrip failed for {}", s.name);
        }
    }

    #[test]
    fn unknown_state() {
        assert_eq!(by_abbr("XX"), None);
        assert_eq!(by_name("Atlantis"), None);
        assert_eq!(state_fips("DC"), None);
    }

    #[test]
    fn case_insensitive_lookups() {
        assert_eq!(state_fips("al"), Some("01"));
        assert_eq!(by_name("New York").map(|s| s.abbr), Some("NY"));
        assert!(is_state_abbr("TX"));
        assert!(!is_state_abbr("tx"));
    }

    #[test]
    fn county_lookup() {
        assert_eq!(county_fips("al", "Baldwin"), Some("01003"));
        assert_eq!(county_fips("AL", "Nowhere"), None);
    }

    #[test]
    fn location_fips_falls_back() {
        assert_eq!(location_fips("AL", Some("Baldwin")), "01003");
        assert_eq!(location_fips("AL", Some("Nowhere")), "01");
        assert_eq!(location_fips("WA", None), "53");
        assert_eq!(location_fips("ZZ", None), FALLBACK_FIPS);
    }
}
