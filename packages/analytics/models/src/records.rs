//! Input tables fetched from the data sources.
//!
//! Every field of a [`ViolationRecord`] is optional: upstream feeds are
//! patchy, and an absent value must not drop the whole row. Which
//! analyses run is decided by [`ViolationColumns`], not by individual
//! values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Violation severity as reported by the regulator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Severity {
    Low,
    Medium,
    High,
    Unknown,
}

impl Severity {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::Unknown]
    }

    /// Parses a severity label, mapping anything unrecognized to
    /// [`Severity::Unknown`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or(Self::Unknown)
    }
}

/// A single regulatory violation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolationRecord {
    pub facility_name: Option<String>,
    pub violation_date: Option<NaiveDate>,
    pub violation_type: Option<String>,
    pub severity: Option<Severity>,
    /// Pollutant or parameter the violation refers to.
    pub parameter: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Discharge volume in gallons, when reported.
    pub discharge_volume: Option<f64>,
    /// Two-letter state of the facility.
    pub state: Option<String>,
    /// County of the facility.
    pub county: Option<String>,
}

impl ViolationRecord {
    /// Both coordinates, when present and finite.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Which columns a violation table carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ViolationColumns {
    pub facility_name: bool,
    pub violation_date: bool,
    pub violation_type: bool,
    pub severity: bool,
    pub parameter: bool,
    /// Both latitude and longitude.
    pub coordinates: bool,
    pub discharge_volume: bool,
}

impl ViolationColumns {
    /// Every column present.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            facility_name: true,
            violation_date: true,
            violation_type: true,
            severity: true,
            parameter: true,
            coordinates: true,
            discharge_volume: true,
        }
    }

    /// A column counts as present when at least one record carries it.
    #[must_use]
    pub fn infer(records: &[ViolationRecord]) -> Self {
        let mut columns = Self::default();
        for record in records {
            columns.facility_name |= record.facility_name.is_some();
            columns.violation_date |= record.violation_date.is_some();
            columns.violation_type |= record.violation_type.is_some();
            columns.severity |= record.severity.is_some();
            columns.parameter |= record.parameter.is_some();
            columns.coordinates |= record.latitude.is_some() && record.longitude.is_some();
            columns.discharge_volume |= record.discharge_volume.is_some();
        }
        columns
    }

    /// Columns present from a header row. Unrecognized headers are
    /// ignored.
    #[must_use]
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut columns = Self::default();
        let mut latitude = false;
        let mut longitude = false;
        for header in headers {
            match header.trim().to_lowercase().as_str() {
                "facility_name" => columns.facility_name = true,
                "violation_date" => columns.violation_date = true,
                "violation_type" => columns.violation_type = true,
                "severity" => columns.severity = true,
                "parameter" => columns.parameter = true,
                "latitude" => latitude = true,
                "longitude" => longitude = true,
                "discharge_volume" => columns.discharge_volume = true,
                _ => {}
            }
        }
        columns.coordinates = latitude && longitude;
        columns
    }
}

/// Violation records plus the columns they were loaded with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViolationTable {
    records: Vec<ViolationRecord>,
    columns: ViolationColumns,
}

impl ViolationTable {
    /// Builds a table whose columns are inferred from the records.
    #[must_use]
    pub fn from_records(records: Vec<ViolationRecord>) -> Self {
        let columns = ViolationColumns::infer(&records);
        Self { records, columns }
    }

    /// Builds a table with explicit column presence.
    #[must_use]
    pub const fn with_columns(records: Vec<ViolationRecord>, columns: ViolationColumns) -> Self {
        Self { records, columns }
    }

    #[must_use]
    pub fn records(&self) -> &[ViolationRecord] {
        &self.records
    }

    #[must_use]
    pub const fn columns(&self) -> ViolationColumns {
        self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keeps the records matching `predicate`. Column presence is
    /// unchanged.
    #[must_use]
    pub fn filtered(&self, predicate: impl Fn(&ViolationRecord) -> bool) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| predicate(r))
                .cloned()
                .collect(),
            columns: self.columns,
        }
    }
}

/// Daily precipitation at a weather station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationRecord {
    pub date: NaiveDate,
    /// Inches of rain; `None` when the station did not report.
    #[serde(default)]
    pub precipitation_inches: Option<f64>,
    #[serde(default)]
    pub station: Option<String>,
}

/// A permitted facility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityRecord {
    pub facility_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub permit_status: Option<String>,
    pub compliance_status: Option<String>,
}

/// County population.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationRecord {
    pub state: Option<String>,
    pub county: Option<String>,
    pub population: Option<u64>,
}

/// County income demographics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeRecord {
    pub state: Option<String>,
    pub county: Option<String>,
    pub median_household_income: Option<f64>,
    /// Share of residents below the poverty line, in percent.
    pub poverty_rate: Option<f64>,
}

/// Everything fetched for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datasets {
    pub violations: ViolationTable,
    pub facilities: Vec<FacilityRecord>,
    pub precipitation: Vec<PrecipitationRecord>,
    pub population: Vec<PopulationRecord>,
    pub income: Vec<IncomeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_labels() {
        assert_eq!(Severity::from_label("HIGH"), Severity::High);
        assert_eq!(Severity::from_label(" medium "), Severity::Medium);
        assert_eq!(Severity::from_label("catastrophic"), Severity::Unknown);
        assert_eq!(Severity::Low.to_string(), "low");
    }

    #[test]
    fn infers_columns_from_records() {
        let records = vec![
            ViolationRecord {
                facility_name: Some("Plant A".to_string()),
                latitude: Some(30.5),
                ..ViolationRecord::default()
            },
            ViolationRecord {
                longitude: Some(-87.7),
                severity: Some(Severity::High),
                ..ViolationRecord::default()
            },
        ];
        let columns = ViolationColumns::infer(&records);
        assert!(columns.facility_name);
        assert!(columns.severity);
        assert!(!columns.violation_date);
        // Latitude and longitude never appear on the same row.
        assert!(!columns.coordinates);
    }

    #[test]
    fn columns_from_headers() {
        let columns =
            ViolationColumns::from_headers(["Facility_Name", "latitude", "longitude", "extra"]);
        assert!(columns.facility_name);
        assert!(columns.coordinates);
        assert!(!columns.severity);
    }

    #[test]
    fn filtering_keeps_columns() {
        let table = ViolationTable::with_columns(
            vec![ViolationRecord::default(); 3],
            ViolationColumns::all(),
        );
        let filtered = table.filtered(|_| false);
        assert!(filtered.is_empty());
        assert_eq!(filtered.columns(), ViolationColumns::all());
    }

    #[test]
    fn coordinates_require_both_finite() {
        let record = ViolationRecord {
            latitude: Some(f64::NAN),
            longitude: Some(1.0),
            ..ViolationRecord::default()
        };
        assert_eq!(record.coordinates(), None);
    }
}
