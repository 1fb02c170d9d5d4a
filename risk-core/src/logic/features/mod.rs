//! Features Module - Feature Engineering
//!
//! Derives model inputs from processed NPPES rows. Each extractor adds its
//! columns to the table in place; `engineer` runs them in order, picks the
//! target and selects the final columns.

pub mod completeness;
pub mod geographic;
pub mod license;
pub mod organization;
pub mod select;
pub mod status;
pub mod target;
pub mod taxonomy;


use chrono::NaiveDate;
use thiserror::Error;

use crate::logic::dataset::{DatasetError, RowRef, Table};

// Re-export common types
pub use select::select_features;
pub use target::{create_target, TargetSource, TARGET_COLUMN};

/// Output of the feature stage
pub const FEATURES_FILE: &str = "hospitals_features.csv";

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("No suitable target variable found in data")]
    NoTarget,
}

/// Result of a feature engineering run
#[derive(Debug)]
pub struct Engineered {
    pub table: Table,
    pub target: TargetSource,
}

/// Run every extractor, build the target and select columns.
/// `today` anchors the day-count features.
pub fn engineer(mut table: Table, today: NaiveDate) -> Result<Engineered, FeatureError> {
    completeness::add_completeness_features(&mut table)?;
    taxonomy::add_taxonomy_features(&mut table)?;
    license::add_license_features(&mut table)?;
    status::add_status_features(&mut table, today)?;
    organization::add_organization_features(&mut table)?;
    geographic::add_geographic_features(&mut table)?;

    let target = create_target(&mut table)?;
    let table = select_features(&table, target);

    log::info!(
        "Engineered {} records with {} columns (target: {})",
        table.len(),
        table.headers().len(),
        target
    );
    Ok(Engineered { table, target })
}

fn flag(value: bool) -> Option<f64> {
    Some(if value { 1.0 } else { 0.0 })
}

/// 1 where `column` has a value, 0 otherwise
fn presence(table: &Table, column: &str) -> Vec<Option<f64>> {
    table.rows().map(|row| flag(row.is_present(column))).collect()
}

fn map_rows<T, F>(table: &Table, f: F) -> Vec<T>
where
    F: FnMut(RowRef<'_>) -> T,
{
    table.rows().map(f).collect()
}
