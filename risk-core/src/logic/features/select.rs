//! Final column selection with leakage exclusion

use std::collections::HashSet;

use super::completeness::{COMPLETENESS_SCORE, COMPLETE_SUFFIX, MISSING_CRITICAL};
use super::target::{TargetSource, DEACTIVATION_HISTORY, TARGET_COLUMN};
use crate::logic::dataset::nppes::NPI_COLUMN;
use crate::logic::dataset::Table;

/// Passthrough prefix for payer transparency-in-coverage columns
pub const UHC_PREFIX: &str = "uhc_";

const ENGINEERED: [&str; 13] = [
    "num_taxonomy_codes",
    "hospital_type",
    "num_licenses",
    "has_primary_license",
    "license_state_match",
    "is_reactivated",
    "days_since_enumeration",
    "days_since_update",
    "recently_updated",
    "is_subpart",
    "has_parent_org",
    "state",
    "region",
];

/// Columns that reveal a deactivation-history target
const DEACTIVATION_LEAKS: [&str; 4] = [
    "is_deactivated",
    "has_deactivation_date",
    DEACTIVATION_HISTORY,
    "is_reactivated",
];

/// Feature columns followed by the target, reference columns and NPI
pub fn select_features(table: &Table, target: TargetSource) -> Table {
    let completeness_is_target = matches!(
        target,
        TargetSource::MissingCriticalFields | TargetSource::PoorDataQuality
    );

    let mut columns: Vec<String> = Vec::new();

    if !completeness_is_target {
        columns.extend(
            table
                .headers()
                .iter()
                .filter(|h| h.ends_with(COMPLETE_SUFFIX))
                .cloned(),
        );
        columns.push(COMPLETENESS_SCORE.to_string());
        columns.push(MISSING_CRITICAL.to_string());
    }

    columns.extend(ENGINEERED.iter().map(|c| c.to_string()));
    columns.extend(
        table
            .headers()
            .iter()
            .filter(|h| h.starts_with(UHC_PREFIX))
            .cloned(),
    );

    if target == TargetSource::DeactivationHistory {
        columns.retain(|c| !DEACTIVATION_LEAKS.contains(&c.as_str()));
        log::info!("Excluded deactivation features to prevent target leakage");
    }

    for reference in [TARGET_COLUMN, DEACTIVATION_HISTORY, "is_deactivated", NPI_COLUMN] {
        columns.push(reference.to_string());
    }

    let mut seen = HashSet::new();
    columns.retain(|c| seen.insert(c.clone()));

    let selected = table.select(&columns);
    log::info!("Selected {} columns", selected.headers().len());
    selected
}
