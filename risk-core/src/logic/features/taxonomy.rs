//! Taxonomy features

use super::map_rows;
use crate::logic::dataset::nppes::taxonomy_columns;
use crate::logic::dataset::{DatasetError, Table};

pub const PRIMARY_TAXONOMY: &str = "Healthcare Provider Taxonomy Code_1";
pub const NUM_TAXONOMY_CODES: &str = "num_taxonomy_codes";
pub const HOSPITAL_TYPE: &str = "hospital_type";

/// Hospital category keyed by the first four characters of the primary code
pub const HOSPITAL_TYPES: [(&str, &str); 6] = [
    ("282N", "General_Acute_Care"),
    ("282E", "Long_Term_Care"),
    ("283Q", "Psychiatric"),
    ("2843", "Rehabilitation"),
    ("282Y", "Specialty"),
    ("282V", "Long_Term_Care_Hospital"),
];

pub const OTHER_HOSPITAL_TYPE: &str = "Other";

pub fn hospital_type(code: Option<&str>) -> &'static str {
    let Some(prefix) = code.and_then(|c| c.get(..4)) else {
        return OTHER_HOSPITAL_TYPE;
    };
    HOSPITAL_TYPES
        .iter()
        .find(|(key, _)| *key == prefix)
        .map(|(_, name)| *name)
        .unwrap_or(OTHER_HOSPITAL_TYPE)
}

pub fn add_taxonomy_features(table: &mut Table) -> Result<(), DatasetError> {
    let columns: Vec<String> = taxonomy_columns(table)
        .into_iter()
        .filter(|c| c.contains('_'))
        .collect();

    let counts = map_rows(table, |row| {
        Some(columns.iter().filter(|c| row.is_present(c)).count() as f64)
    });
    table.add_numeric_column(NUM_TAXONOMY_CODES, counts)?;

    if table.has_column(PRIMARY_TAXONOMY) {
        let types = map_rows(table, |row| {
            Some(hospital_type(row.get(PRIMARY_TAXONOMY)).to_string())
        });
        table.add_column(HOSPITAL_TYPE, types)?;
    }
    Ok(())
}
