//! Applies [`QueryFilters`] to fetched violations.

use climatebud_analytics_models::{ViolationRecord, ViolationTable};
use climatebud_query_models::QueryFilters;

/// Keeps the violations matching every refinement in `filters`.
///
/// A refinement on a column the table does not carry is skipped with a
/// warning rather than emptying the table.
#[must_use]
pub fn apply_filters(violations: &ViolationTable, filters: &QueryFilters) -> ViolationTable {
    if filters.is_empty() {
        return violations.clone();
    }

    let columns = violations.columns();

    let types = lowercase_terms(filters.violation_types.as_deref());
    let types = if types.is_empty() || columns.violation_type {
        types
    } else {
        log::warn!("Ignoring violation type filter: no violation_type column");
        Vec::new()
    };

    let severities = lowercase_terms(filters.severity.as_deref());
    let severities = if severities.is_empty() || columns.severity {
        severities
    } else {
        log::warn!("Ignoring severity filter: no severity column");
        Vec::new()
    };

    let facility = filters
        .facility_name
        .as_deref()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty());
    let facility = match facility {
        Some(_) if !columns.facility_name => {
            log::warn!("Ignoring facility filter: no facility_name column");
            None
        }
        other => other,
    };

    let filtered = violations.filtered(|record| {
        matches_type(record, &types)
            && matches_severity(record, &severities)
            && matches_facility(record, facility.as_deref())
    });

    log::debug!(
        "Filters kept {} of {} violations",
        filtered.len(),
        violations.len()
    );

    filtered
}

fn lowercase_terms(terms: Option<&[String]>) -> Vec<String> {
    terms
        .unwrap_or_default()
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn matches_type(record: &ViolationRecord, types: &[String]) -> bool {
    types.is_empty()
        || record.violation_type.as_deref().is_some_and(|value| {
            let value = value.to_lowercase();
            types.iter().any(|t| value.contains(t.as_str()))
        })
}

fn matches_severity(record: &ViolationRecord, severities: &[String]) -> bool {
    severities.is_empty()
        || record
            .severity
            .is_some_and(|s| severities.iter().any(|wanted| wanted == s.as_ref()))
}

fn matches_facility(record: &ViolationRecord, facility: Option<&str>) -> bool {
    facility.is_none_or(|wanted| {
        record
            .facility_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(wanted))
    })
}
