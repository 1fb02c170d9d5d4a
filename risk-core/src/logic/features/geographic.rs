//! Geographic features

use super::license::PRACTICE_STATE;
use super::map_rows;
use crate::logic::dataset::{DatasetError, Table};

pub const OTHER_REGION: &str = "Other";

pub fn region_for_state(state: &str) -> &'static str {
    match state {
        "CA" | "OR" | "WA" | "NV" | "AZ" => "West",
        "NY" | "MA" | "PA" | "NJ" => "Northeast",
        "TX" | "FL" | "GA" | "NC" => "South",
        "IL" | "OH" | "MI" | "WI" => "Midwest",
        _ => OTHER_REGION,
    }
}

pub fn add_geographic_features(table: &mut Table) -> Result<(), DatasetError> {
    if !table.has_column(PRACTICE_STATE) {
        return Ok(());
    }

    let states = map_rows(table, |row| row.get(PRACTICE_STATE).map(str::to_string));
    let regions = states
        .iter()
        .map(|s| Some(s.as_deref().map_or(OTHER_REGION, region_for_state).to_string()))
        .collect();

    table.add_column("state", states)?;
    table.add_column("region", regions)?;
    Ok(())
}
