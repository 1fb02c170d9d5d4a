//! Target variable
//!
//! Priority: claims data, then NPI deactivation history, then registry
//! completeness.

use serde::{Deserialize, Serialize};

use super::completeness::{COMPLETENESS_SCORE, CRITICAL_COMPLETENESS, MISSING_CRITICAL};
use super::status::DEACTIVATION_DATE;
use super::{flag, map_rows, presence, FeatureError};
use crate::logic::dataset::Table;

pub const TARGET_COLUMN: &str = "likely_denied";
pub const DENIAL_RATE: &str = "denial_rate";
pub const DEACTIVATION_HISTORY: &str = "has_deactivation_history";

/// Claims denial rate above which a provider counts as likely denied
pub const DENIAL_RATE_THRESHOLD: f64 = 0.1;

/// Deactivation history is only used with more positives than this
pub const MIN_DEACTIVATIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    /// `likely_denied` already present from claims data
    Claims,
    /// `denial_rate` > 0.1
    ClaimsDenialRate,
    DeactivationHistory,
    MissingCriticalFields,
    PoorDataQuality,
}

impl std::fmt::Display for TargetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TargetSource::Claims => "claims denial",
            TargetSource::ClaimsDenialRate => "claims denial rate",
            TargetSource::DeactivationHistory => "NPI deactivation history",
            TargetSource::MissingCriticalFields => "missing critical fields",
            TargetSource::PoorDataQuality => "poor data quality",
        };
        f.write_str(name)
    }
}

/// Add `likely_denied` (and `has_deactivation_history` when the date column
/// exists); returns which source was used
pub fn create_target(table: &mut Table) -> Result<TargetSource, FeatureError> {
    if table.has_column(TARGET_COLUMN) {
        log::info!("Claims data detected; using likely_denied as target");
        return Ok(TargetSource::Claims);
    }

    if table.has_column(DENIAL_RATE) {
        let target = map_rows(table, |row| {
            flag(row.get_f64(DENIAL_RATE).is_some_and(|r| r > DENIAL_RATE_THRESHOLD))
        });
        table.add_numeric_column(TARGET_COLUMN, target)?;
        log::info!("Claims data detected; using denial_rate > {} as target", DENIAL_RATE_THRESHOLD);
        return Ok(TargetSource::ClaimsDenialRate);
    }

    if table.has_column(DEACTIVATION_DATE) {
        let history = presence(table, DEACTIVATION_DATE);
        let count = history.iter().filter(|v| **v == Some(1.0)).count();
        table.add_numeric_column(DEACTIVATION_HISTORY, history.clone())?;

        if count > MIN_DEACTIVATIONS {
            table.add_numeric_column(TARGET_COLUMN, history)?;
            log::info!(
                "Using NPI deactivation history as target ({} of {} providers)",
                count,
                table.len()
            );
            return Ok(TargetSource::DeactivationHistory);
        }
        log::warn!(
            "Only {} deactivated providers (need more than {}); falling back",
            count,
            MIN_DEACTIVATIONS
        );
    }

    if let Some(missing) = table.numeric_column(MISSING_CRITICAL) {
        table.add_numeric_column(TARGET_COLUMN, missing)?;
        log::info!("Using missing critical fields as target");
        return Ok(TargetSource::MissingCriticalFields);
    }

    if let Some(scores) = table.numeric_column(COMPLETENESS_SCORE) {
        let target = scores
            .into_iter()
            .map(|s| flag(s.is_some_and(|s| s < CRITICAL_COMPLETENESS)))
            .collect();
        table.add_numeric_column(TARGET_COLUMN, target)?;
        log::info!("Using poor data quality (<80% complete) as target");
        return Ok(TargetSource::PoorDataQuality);
    }

    Err(FeatureError::NoTarget)
}
