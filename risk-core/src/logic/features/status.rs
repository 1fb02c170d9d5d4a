//! Registration status features

use chrono::NaiveDate;

use super::{flag, map_rows, presence};
use crate::logic::dataset::nppes::parse_date;
use crate::logic::dataset::{DatasetError, Table};

pub const DEACTIVATION_REASON: &str = "NPI Deactivation Reason Code";
pub const DEACTIVATION_DATE: &str = "NPI Deactivation Date";
pub const REACTIVATION_DATE: &str = "NPI Reactivation Date";
pub const ENUMERATION_DATE: &str = "Provider Enumeration Date";
pub const LAST_UPDATE_DATE: &str = "Last Update Date";

/// Updated within this many days counts as recent
pub const RECENT_UPDATE_DAYS: f64 = 365.0;

/// Whole days from `column` to `today`; unparseable or missing dates count as 0
fn days_since(table: &Table, column: &str, today: NaiveDate) -> Vec<Option<f64>> {
    map_rows(table, |row| {
        let days = row
            .get(column)
            .and_then(parse_date)
            .map(|d| (today - d).num_days() as f64)
            .unwrap_or(0.0);
        Some(days)
    })
}

pub fn add_status_features(table: &mut Table, today: NaiveDate) -> Result<(), DatasetError> {
    let presence_flags = [
        (DEACTIVATION_REASON, "is_deactivated"),
        (DEACTIVATION_DATE, "has_deactivation_date"),
        (REACTIVATION_DATE, "is_reactivated"),
    ];
    for (source, feature) in presence_flags {
        if table.has_column(source) {
            let values = presence(table, source);
            table.add_numeric_column(feature, values)?;
        }
    }

    if table.has_column(ENUMERATION_DATE) {
        let days = days_since(table, ENUMERATION_DATE, today);
        table.add_numeric_column("days_since_enumeration", days)?;
    }

    if table.has_column(LAST_UPDATE_DATE) {
        let days = days_since(table, LAST_UPDATE_DATE, today);
        let recent = days
            .iter()
            .map(|d| flag(d.unwrap_or(0.0) < RECENT_UPDATE_DAYS))
            .collect();
        table.add_numeric_column("days_since_update", days)?;
        table.add_numeric_column("recently_updated", recent)?;
    }
    Ok(())
}
