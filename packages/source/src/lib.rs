#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Environmental data source trait and the CSV directory implementation.
//!
//! Each source fetches the tables an analysis needs for one county and
//! window. Fetches never fail: an unavailable table comes back empty and
//! the analysis reports the missing data itself.

pub mod csv_dir;
pub mod parsing;

use async_trait::async_trait;
use chrono::NaiveDate;
use climatebud_analytics_models::{
    FacilityRecord, IncomeRecord, PopulationRecord, PrecipitationRecord, ViolationTable,
};
use climatebud_geography_models::ResolvedLocation;

pub use csv_dir::CsvDirectorySource;

/// Errors that can occur while reading source files.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Trait that all environmental data sources implement.
///
/// `state` is a two-letter abbreviation and `county` a county name without
/// the "County" suffix. Date bounds are inclusive.
#[async_trait]
pub trait EnvironmentalDataSource: Send + Sync {
    /// Regulatory violations in the county within `start..=end`.
    async fn get_violations(
        &self,
        state: &str,
        county: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ViolationTable;

    /// Permitted facilities in the county.
    async fn get_facilities(&self, state: &str, county: &str) -> Vec<FacilityRecord>;

    /// Daily precipitation for the location within `start..=end`.
    async fn get_precipitation(
        &self,
        location: &ResolvedLocation,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<PrecipitationRecord>;

    /// County population.
    async fn get_population(&self, state: &str, county: &str) -> Vec<PopulationRecord>;

    /// County income and poverty figures.
    async fn get_income_demographics(&self, state: &str, county: &str) -> Vec<IncomeRecord>;
}

/// A source with no data, used when no data directory is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

#[async_trait]
impl EnvironmentalDataSource for EmptySource {
    async fn get_violations(
        &self,
        _state: &str,
        _county: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> ViolationTable {
        ViolationTable::default()
    }

    async fn get_facilities(&self, _state: &str, _county: &str) -> Vec<FacilityRecord> {
        Vec::new()
    }

    async fn get_precipitation(
        &self,
        _location: &ResolvedLocation,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Vec<PrecipitationRecord> {
        Vec::new()
    }

    async fn get_population(&self, _state: &str, _county: &str) -> Vec<PopulationRecord> {
        Vec::new()
    }

    async fn get_income_demographics(&self, _state: &str, _county: &str) -> Vec<IncomeRecord> {
        Vec::new()
    }
}
