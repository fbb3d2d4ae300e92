#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic location types.
//!
//! A [`Location`] is what a query or a model response names (any part may
//! be missing). A [`ResolvedLocation`] is what the rest of the pipeline
//! works with: state and county are always filled in, falling back to the
//! configured default location.

pub mod fips;

use serde::{Deserialize, Serialize};

/// A possibly incomplete location extracted from free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Two-letter state abbreviation.
    #[serde(default)]
    pub state: Option<String>,
    /// County name without the "County" suffix.
    #[serde(default)]
    pub county: Option<String>,
    /// City name.
    #[serde(default)]
    pub city: Option<String>,
}

impl Location {
    /// Fills missing state and county from the given defaults.
    #[must_use]
    pub fn resolve(self, default_state: &str, default_county: &str) -> ResolvedLocation {
        ResolvedLocation {
            state: non_blank(self.state).unwrap_or_else(|| default_state.to_string()),
            county: non_blank(self.county).unwrap_or_else(|| default_county.to_string()),
            city: non_blank(self.city),
        }
    }
}

/// A location whose state and county are always known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// Two-letter state abbreviation.
    pub state: String,
    /// County name without the "County" suffix.
    pub county: String,
    /// City name, when the query named one.
    pub city: Option<String>,
}

impl ResolvedLocation {
    /// Five-digit county FIPS when known, otherwise the state FIPS.
    #[must_use]
    pub fn fips(&self) -> &'static str {
        fips::location_fips(&self.state, Some(&self.county))
    }
}

impl std::fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} County, {}", self.county, self.state)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
