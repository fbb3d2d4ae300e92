//! Environmental data read from CSV files in a local directory.
//!
//! Expected files, each optional:
//!
//! | File | Columns |
//! |---|---|
//! | `violations.csv` | `facility_name`, `violation_date`, `violation_type`, `severity`, `parameter`, `latitude`, `longitude`, `discharge_volume`, `state`, `county` |
//! | `facilities.csv` | `facility_name`, `city`, `state`, `county`, `latitude`, `longitude`, `permit_status`, `compliance_status` |
//! | `precipitation.csv` | `date`, `precipitation_inches` (or `prcp`), `station`, `state`, `county` |
//! | `population.csv` | `state`, `county`, `population` |
//! | `income.csv` | `state`, `county`, `median_household_income`, `poverty_rate` |
//!
//! Header names are case-insensitive. Rows are filtered by state, county,
//! and date only when the file has the matching column.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use climatebud_analytics_models::{
    FacilityRecord, IncomeRecord, PopulationRecord, PrecipitationRecord, Severity,
    ViolationColumns, ViolationRecord, ViolationTable,
};
use climatebud_geography_models::ResolvedLocation;

use crate::parsing::{
    county_matches, non_blank, parse_date, parse_f64, parse_lat_lng, parse_u64, state_matches,
};
use crate::{EnvironmentalDataSource, SourceError};

const VIOLATIONS_FILE: &str = "violations.csv";
const FACILITIES_FILE: &str = "facilities.csv";
const PRECIPITATION_FILE: &str = "precipitation.csv";
const POPULATION_FILE: &str = "population.csv";
const INCOME_FILE: &str = "income.csv";

/// A CSV file loaded into memory with a header index.
#[derive(Debug)]
struct CsvFile {
    headers: Vec<String>,
    index: BTreeMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl CsvFile {
    fn read(path: &Path) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();

        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            headers,
            index,
            rows,
        })
    }

    fn has(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|record| Row {
            index: &self.index,
            record,
        })
    }
}

/// One CSV row with cells looked up by header name.
struct Row<'a> {
    index: &'a BTreeMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl Row<'_> {
    fn get(&self, column: &str) -> Option<&str> {
        non_blank(self.index.get(column).and_then(|&i| self.record.get(i)))
    }

    fn string(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }

    fn f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(parse_f64)
    }

    fn date(&self, column: &str) -> Option<NaiveDate> {
        self.get(column).and_then(parse_date)
    }

    /// Whether the row belongs to `state` and `county`. A missing column
    /// matches everything; a blank cell in a present column matches
    /// nothing.
    fn in_area(&self, file: &CsvFile, state: &str, county: &str) -> bool {
        let state_ok = !file.has("state")
            || self.get("state").is_some_and(|cell| state_matches(cell, state));
        let county_ok = !file.has("county")
            || self
                .get("county")
                .is_some_and(|cell| county_matches(cell, county));
        state_ok && county_ok
    }
}

/// Reads environmental tables from a directory of CSV files.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    directory: PathBuf,
}

impl CsvDirectorySource {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Loads `name`, logging and returning `None` when it is missing or
    /// unreadable.
    fn load(&self, name: &str) -> Option<CsvFile> {
        let path = self.directory.join(name);
        if !path.is_file() {
            log::warn!("{} not found, treating as empty", path.display());
            return None;
        }

        match CsvFile::read(&path) {
            Ok(file) => {
                log::debug!("Read {} rows from {}", file.rows.len(), path.display());
                Some(file)
            }
            Err(e) => {
                log::warn!("Failed to read {}, treating as empty: {e}", path.display());
                None
            }
        }
    }

    /// Reads `violations.csv` without swallowing errors.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be opened or parsed.
    pub fn read_violations(
        &self,
        state: &str,
        county: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ViolationTable, SourceError> {
        let file = CsvFile::read(&self.directory.join(VIOLATIONS_FILE))?;
        Ok(violations_from(&file, state, county, start, end))
    }
}

fn violations_from(
    file: &CsvFile,
    state: &str,
    county: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> ViolationTable {
    let columns = ViolationColumns::from_headers(file.headers.iter().map(String::as_str));
    let filter_dates = file.has("violation_date");

    let records = file
        .rows()
        .filter(|row| row.in_area(file, state, county))
        .map(|row| {
            let coordinates = parse_lat_lng(row.get("latitude"), row.get("longitude"));
            ViolationRecord {
                facility_name: row.string("facility_name"),
                violation_date: row.date("violation_date"),
                violation_type: row.string("violation_type"),
                severity: row.get("severity").map(Severity::from_label),
                parameter: row.string("parameter"),
                latitude: coordinates.map(|(lat, _)| lat),
                longitude: coordinates.map(|(_, lon)| lon),
                discharge_volume: row.f64("discharge_volume"),
                state: row.string("state"),
                county: row.string("county"),
            }
        })
        .filter(|record| {
            !filter_dates
                || record
                    .violation_date
                    .is_some_and(|date| start <= date && date <= end)
        })
        .collect();

    ViolationTable::with_columns(records, columns)
}

fn precipitation_from(
    file: &CsvFile,
    location: &ResolvedLocation,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<PrecipitationRecord> {
    let amount_column = if file.has("precipitation_inches") {
        "precipitation_inches"
    } else {
        "prcp"
    };

    file.rows()
        .filter(|row| row.in_area(file, &location.state, &location.county))
        .filter_map(|row| {
            let date = row.date("date")?;
            (start <= date && date <= end).then(|| PrecipitationRecord {
                date,
                precipitation_inches: row.f64(amount_column),
                station: row.string("station"),
            })
        })
        .collect()
}

fn facilities_from(file: &CsvFile, state: &str, county: &str) -> Vec<FacilityRecord> {
    file.rows()
        .filter(|row| row.in_area(file, state, county))
        .map(|row| {
            let coordinates = parse_lat_lng(row.get("latitude"), row.get("longitude"));
            FacilityRecord {
                facility_name: row.string("facility_name"),
                city: row.string("city"),
                state: row.string("state"),
                county: row.string("county"),
                latitude: coordinates.map(|(lat, _)| lat),
                longitude: coordinates.map(|(_, lon)| lon),
                permit_status: row.string("permit_status"),
                compliance_status: row.string("compliance_status"),
            }
        })
        .collect()
}

fn population_from(file: &CsvFile, state: &str, county: &str) -> Vec<PopulationRecord> {
    file.rows()
        .filter(|row| row.in_area(file, state, county))
        .map(|row| PopulationRecord {
            state: row.string("state"),
            county: row.string("county"),
            population: row.get("population").and_then(parse_u64),
        })
        .collect()
}

fn income_from(file: &CsvFile, state: &str, county: &str) -> Vec<IncomeRecord> {
    file.rows()
        .filter(|row| row.in_area(file, state, county))
        .map(|row| IncomeRecord {
            state: row.string("state"),
            county: row.string("county"),
            median_household_income: row.f64("median_household_income"),
            poverty_rate: row.f64("poverty_rate"),
        })
        .collect()
}

#[async_trait]
impl EnvironmentalDataSource for CsvDirectorySource {
    async fn get_violations(
        &self,
        state: &str,
        county: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ViolationTable {
        let table = self
            .load(VIOLATIONS_FILE)
            .map(|file| violations_from(&file, state, county, start, end))
            .unwrap_or_default();
        log::info!(
            "Loaded {} violations for {county}, {state} ({start} to {end})",
            table.len()
        );
        table
    }

    async fn get_facilities(&self, state: &str, county: &str) -> Vec<FacilityRecord> {
        self.load(FACILITIES_FILE)
            .map(|file| facilities_from(&file, state, county))
            .unwrap_or_default()
    }

    async fn get_precipitation(
        &self,
        location: &ResolvedLocation,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<PrecipitationRecord> {
        let records = self
            .load(PRECIPITATION_FILE)
            .map(|file| precipitation_from(&file, location, start, end))
            .unwrap_or_default();
        log::info!(
            "Loaded {} precipitation days for {location} (FIPS {})",
            records.len(),
            location.fips()
        );
        records
    }

    async fn get_population(&self, state: &str, county: &str) -> Vec<PopulationRecord> {
        self.load(POPULATION_FILE)
            .map(|file| population_from(&file, state, county))
            .unwrap_or_default()
    }

    async fn get_income_demographics(&self, state: &str, county: &str) -> Vec<IncomeRecord> {
        self.load(INCOME_FILE)
            .map(|file| income_from(&file, state, county))
            .unwrap_or_default()
    }
}
