//! NPPES registry processing
//!
//! Raw dissemination file -> organization rows, hospital taxonomy flag,
//! normalized missing values and ISO dates.

use chrono::NaiveDate;
use serde::Serialize;

use super::table::{parse_number, Cell, Table};
use super::DatasetError;

pub const NPI_COLUMN: &str = "NPI";
pub const ENTITY_TYPE_COLUMN: &str = "Entity Type Code";
pub const TAXONOMY_COLUMN_MARKER: &str = "Healthcare Provider Taxonomy Code";
pub const HOSPITAL_FLAG_COLUMN: &str = "is_hospital_by_taxonomy";
pub const ORGANIZATION_NAME_COLUMN: &str = "Provider Organization Name (Legal Business Name)";

/// 1 = individual, 2 = organization
const ORGANIZATION_ENTITY_TYPE: f64 = 2.0;

/// Taxonomy prefixes that identify hospitals
pub const HOSPITAL_TAXONOMY_PREFIXES: [&str; 6] = ["282N", "282E", "283Q", "2843", "282Y", "282V"];

pub const DATE_COLUMNS: [&str; 5] = [
    "Provider Enumeration Date",
    "Last Update Date",
    "NPI Deactivation Date",
    "NPI Reactivation Date",
    "Certification Date",
];

const UNAVAILABLE: &str = "<UNAVAIL>";

const DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Counts from one processing run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessSummary {
    pub rows_read: usize,
    pub organizations: usize,
    pub individuals_removed: usize,
    pub hospitals_by_taxonomy: usize,
}

/// Keep organization rows (`Entity Type Code` 2, written as "2" or "2.0")
pub fn filter_organizations(table: &mut Table) -> Result<usize, DatasetError> {
    table.require(ENTITY_TYPE_COLUMN)?;
    let before = table.len();
    table.retain_rows(|row| row.get_f64(ENTITY_TYPE_COLUMN) == Some(ORGANIZATION_ENTITY_TYPE));
    let removed = before - table.len();
    log::info!(
        "Found {} organization records, removed {} individual providers",
        table.len(),
        removed
    );
    Ok(removed)
}

pub fn taxonomy_columns(table: &Table) -> Vec<String> {
    table
        .headers()
        .iter()
        .filter(|h| h.contains(TAXONOMY_COLUMN_MARKER) && !h.ends_with("_complete"))
        .cloned()
        .collect()
}

pub fn is_hospital_taxonomy(code: &str) -> bool {
    HOSPITAL_TAXONOMY_PREFIXES
        .iter()
        .any(|prefix| code.starts_with(prefix))
}

/// Add `is_hospital_by_taxonomy` ("True"/"False"); returns the number flagged
pub fn flag_hospital_taxonomy(table: &mut Table) -> Result<usize, DatasetError> {
    let columns = taxonomy_columns(table);

    let flags: Vec<bool> = table
        .rows()
        .map(|row| {
            columns
                .iter()
                .filter_map(|c| row.get(c))
                .any(is_hospital_taxonomy)
        })
        .collect();

    let count = flags.iter().filter(|f| **f).count();
    let cells = flags
        .into_iter()
        .map(|f| Some(if f { "True" } else { "False" }.to_string()))
        .collect();
    table.add_column(HOSPITAL_FLAG_COLUMN, cells)?;

    log::info!("Identified {} records as hospitals by taxonomy codes", count);
    Ok(count)
}

/// Parse an NPPES date (`MM/DD/YYYY`) or an already-normalized ISO date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Dates written back with a time component
    let s = s.split_whitespace().next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn is_missing_marker(s: &str) -> bool {
    s.trim().is_empty() || s == UNAVAILABLE
}

/// Normalize missing markers and rewrite date columns as ISO dates
pub fn clean(table: &mut Table) {
    table.map_cells(|column, cell: Cell| {
        let value = cell.filter(|s| !is_missing_marker(s))?;
        if DATE_COLUMNS.contains(&column) {
            parse_date(&value).map(|d| d.format("%Y-%m-%d").to_string())
        } else {
            Some(value)
        }
    });
}

/// Whole processing stage over a raw registry table
pub fn process(table: &mut Table) -> Result<ProcessSummary, DatasetError> {
    let rows_read = table.len();
    let individuals_removed = filter_organizations(table)?;
    let hospitals_by_taxonomy = flag_hospital_taxonomy(table)?;
    clean(table);

    Ok(ProcessSummary {
        rows_read,
        organizations: table.len(),
        individuals_removed,
        hospitals_by_taxonomy,
    })
}

/// Normalize an NPI for lookup ("1234567890.0" -> "1234567890")
pub fn normalize_npi(raw: &str) -> String {
    let raw = raw.trim();
    match parse_number(raw) {
        Some(v) if v.fract() == 0.0 && v >= 0.0 => format!("{}", v as u64),
        _ => raw.to_string(),
    }
}
