//! License features

use super::{flag, map_rows, presence};
use crate::logic::dataset::{DatasetError, Table};

pub const LICENSE_PREFIX: &str = "Provider License Number_";
pub const PRIMARY_LICENSE: &str = "Provider License Number_1";
pub const PRIMARY_LICENSE_STATE: &str = "Provider License Number State Code_1";
pub const PRACTICE_STATE: &str = "Provider Business Practice Location Address State Name";

/// `Provider License Number_N` columns; the `... State Code_N` columns do not
/// match the prefix and are not counted
pub fn license_columns(table: &Table) -> Vec<String> {
    table
        .headers()
        .iter()
        .filter(|h| h.starts_with(LICENSE_PREFIX) && !h.ends_with(super::completeness::COMPLETE_SUFFIX))
        .cloned()
        .collect()
}

pub fn add_license_features(table: &mut Table) -> Result<(), DatasetError> {
    let columns = license_columns(table);
    let counts = map_rows(table, |row| {
        Some(columns.iter().filter(|c| row.is_present(c)).count() as f64)
    });
    table.add_numeric_column("num_licenses", counts)?;

    if table.has_column(PRIMARY_LICENSE) {
        let has_primary = presence(table, PRIMARY_LICENSE);
        table.add_numeric_column("has_primary_license", has_primary)?;
    }

    if table.has_column(PRIMARY_LICENSE_STATE) && table.has_column(PRACTICE_STATE) {
        // Two missing states do not match
        let matches = map_rows(table, |row| {
            flag(matches!(
                (row.get(PRIMARY_LICENSE_STATE), row.get(PRACTICE_STATE)),
                (Some(a), Some(b)) if a == b
            ))
        });
        table.add_numeric_column("license_state_match", matches)?;
    }
    Ok(())
}
