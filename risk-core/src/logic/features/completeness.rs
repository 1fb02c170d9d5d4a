//! Data completeness
//!
//! Incomplete registry records are the main signal available without claims
//! data.

use super::{flag, presence};
use crate::logic::dataset::{DatasetError, Table};

/// Fields a payer needs to process a claim
pub const KEY_FIELDS: [&str; 10] = [
    "Provider Organization Name (Legal Business Name)",
    "Employer Identification Number (EIN)",
    "Provider First Line Business Practice Location Address",
    "Provider Business Practice Location Address City Name",
    "Provider Business Practice Location Address State Name",
    "Provider Business Practice Location Address Postal Code",
    "Provider Business Practice Location Address Telephone Number",
    "Healthcare Provider Taxonomy Code_1",
    "Provider License Number_1",
    "Provider License Number State Code_1",
];

pub const COMPLETE_SUFFIX: &str = "_complete";
pub const COMPLETENESS_SCORE: &str = "data_completeness_score";
pub const MISSING_CRITICAL: &str = "missing_critical_fields";

/// Below this score a record is missing critical fields
pub const CRITICAL_COMPLETENESS: f64 = 0.8;

pub fn complete_column(field: &str) -> String {
    format!("{}{}", field, COMPLETE_SUFFIX)
}

/// `<field>_complete` per key field present, then the mean score and the
/// critical flag. Adds nothing when no key field exists.
pub fn add_completeness_features(table: &mut Table) -> Result<(), DatasetError> {
    let available: Vec<&str> = KEY_FIELDS
        .iter()
        .copied()
        .filter(|f| table.has_column(f))
        .collect();
    if available.is_empty() {
        log::warn!("No key fields present; skipping completeness features");
        return Ok(());
    }

    let mut flags: Vec<Vec<Option<f64>>> = Vec::with_capacity(available.len());
    for field in &available {
        let column = presence(table, field);
        table.add_numeric_column(&complete_column(field), column.clone())?;
        flags.push(column);
    }

    let n = available.len() as f64;
    let scores: Vec<f64> = (0..table.len())
        .map(|row| flags.iter().filter_map(|col| col[row]).sum::<f64>() / n)
        .collect();

    let critical = scores
        .iter()
        .map(|s| flag(*s < CRITICAL_COMPLETENESS))
        .collect();
    table.add_numeric_column(COMPLETENESS_SCORE, scores.into_iter().map(Some).collect())?;
    table.add_numeric_column(MISSING_CRITICAL, critical)?;
    Ok(())
}
