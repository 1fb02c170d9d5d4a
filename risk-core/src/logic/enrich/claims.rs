//! Claims denial data
//!
//! Claim-level rows (NPI, denial_status, optional amount/date/reason) become
//! one row per provider, inner-joined onto the features. The observed denial
//! rate then defines the target.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use super::{mean, merge_on_npi, require_columns, sample_std, EnrichError, Join};
use crate::logic::dataset::nppes::{normalize_npi, NPI_COLUMN};
use crate::logic::dataset::table::{format_number, parse_number};
use crate::logic::dataset::Table;
use crate::logic::features::target::{DENIAL_RATE, DENIAL_RATE_THRESHOLD};
use crate::logic::features::TARGET_COLUMN;

/// Output of the claims merge
pub const CLAIMS_FILE: &str = "hospitals_with_claims.csv";

pub const DENIAL_STATUS: &str = "denial_status";
pub const CLAIM_AMOUNT: &str = "claim_amount";
pub const CLAIM_DATE: &str = "claim_date";
pub const DENIAL_REASON: &str = "denial_reason";

pub const TOTAL_CLAIMS: &str = "total_claims";
pub const TOTAL_DENIALS: &str = "total_denials";
pub const CLAIM_DENIAL_RISK: &str = "claim_denial_risk";
pub const MOST_COMMON_DENIAL_REASON: &str = "most_common_denial_reason";
pub const FIRST_CLAIM_DATE: &str = "claim_date_min";
pub const LAST_CLAIM_DATE: &str = "claim_date_max";

/// Columns derived from the outcome or raw claim dates; written to the
/// merged file but never used as model inputs
pub const CLAIMS_EXCLUDED: [&str; 5] = [
    DENIAL_RATE,
    TOTAL_DENIALS,
    MOST_COMMON_DENIAL_REASON,
    FIRST_CLAIM_DATE,
    LAST_CLAIM_DATE,
];

#[derive(Debug, Clone, Serialize)]
pub struct ClaimsSummary {
    pub claims: usize,
    pub providers: usize,
    pub average_denial_rate: f64,
    /// Providers left after the join; `None` when no feature table existed
    pub merged: Option<usize>,
    pub positive_rate: Option<f64>,
}

/// "denied"/1 -> 1, "approved"/0 and anything unrecognized -> 0
pub fn denial_flag(raw: Option<&str>) -> u8 {
    let Some(raw) = raw else { return 0 };
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("denied") {
        1
    } else {
        u8::from(parse_number(raw) == Some(1.0))
    }
}

/// Read a claims CSV, requiring `NPI` and `denial_status`
pub fn load_claims(path: impl AsRef<Path>) -> Result<Table, EnrichError> {
    let path = path.as_ref();
    log::info!("Loading claims data from {}", path.display());
    let table = Table::read_csv(path, None)?;
    require_columns(&table, &[NPI_COLUMN, DENIAL_STATUS])?;
    log::info!("Loaded {} claims", table.len());
    Ok(table)
}

#[derive(Debug, Default)]
struct ProviderClaims {
    claims: usize,
    denials: usize,
    amounts: Vec<f64>,
    first_date: Option<String>,
    last_date: Option<String>,
    reasons: BTreeMap<String, usize>,
}

impl ProviderClaims {
    fn add_date(&mut self, date: &str) {
        if self.first_date.as_deref().map_or(true, |d| date < d) {
            self.first_date = Some(date.to_string());
        }
        if self.last_date.as_deref().map_or(true, |d| date > d) {
            self.last_date = Some(date.to_string());
        }
    }

    /// Most frequent reason among denied claims; ties go to the smallest
    fn top_reason(&self) -> Option<String> {
        let mut best: Option<(&String, usize)> = None;
        for (reason, &count) in &self.reasons {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((reason, count));
            }
        }
        best.map(|(r, _)| r.clone())
    }
}

/// One row per NPI, sorted by NPI. Amount, date and reason columns appear
/// only when the claims file has them.
pub fn aggregate_claims(claims: &Table) -> Result<Table, EnrichError> {
    require_columns(claims, &[NPI_COLUMN, DENIAL_STATUS])?;
    let has_amount = claims.has_column(CLAIM_AMOUNT);
    let has_date = claims.has_column(CLAIM_DATE);
    let has_reason = claims.has_column(DENIAL_REASON);

    let mut providers: BTreeMap<String, ProviderClaims> = BTreeMap::new();
    for row in claims.rows() {
        let Some(npi) = row.get(NPI_COLUMN) else { continue };
        let stats = providers.entry(normalize_npi(npi)).or_default();

        let denied = denial_flag(row.get(DENIAL_STATUS));
        stats.claims += 1;
        stats.denials += usize::from(denied);

        if let Some(amount) = row.get_f64(CLAIM_AMOUNT) {
            stats.amounts.push(amount);
        }
        if let Some(date) = row.get(CLAIM_DATE) {
            stats.add_date(date);
        }
        if denied == 1 {
            if let Some(reason) = row.get(DENIAL_REASON) {
                *stats.reasons.entry(reason.to_string()).or_default() += 1;
            }
        }
    }

    let mut headers: Vec<String> = [NPI_COLUMN, TOTAL_CLAIMS, TOTAL_DENIALS, DENIAL_RATE]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if has_amount {
        headers.extend(["avg_claim_amount", "std_claim_amount", "total_claim_amount"].map(String::from));
    }
    if has_date {
        headers.extend([FIRST_CLAIM_DATE, LAST_CLAIM_DATE].map(String::from));
    }
    if has_reason {
        headers.push(MOST_COMMON_DENIAL_REASON.to_string());
    }

    let num = |v: f64| Some(format_number(v));
    let mut out = Table::new(headers);
    for (npi, stats) in &providers {
        let mut cells = vec![
            Some(npi.clone()),
            num(stats.claims as f64),
            num(stats.denials as f64),
            num(stats.denials as f64 / stats.claims as f64),
        ];
        if has_amount {
            cells.push(mean(&stats.amounts).and_then(num));
            cells.push(sample_std(&stats.amounts).and_then(num));
            cells.push(num(stats.amounts.iter().sum()));
        }
        if has_date {
            cells.push(stats.first_date.clone());
            cells.push(stats.last_date.clone());
        }
        if has_reason {
            cells.push(stats.top_reason());
        }
        out.push_row(cells);
    }

    log::info!("Aggregated claims to {} providers", out.len());
    Ok(out)
}

/// Inner join onto the features, then `likely_denied` = denial rate above
/// the threshold and `claim_denial_risk` = the rate itself
pub fn merge_claims(features: &Table, provider_claims: &Table) -> Result<Table, EnrichError> {
    let mut merged = merge_on_npi(features, provider_claims, Join::Inner)?;

    let rates = merged.numeric_column(DENIAL_RATE).unwrap_or_default();
    let target = rates
        .iter()
        .map(|rate| Some(if rate.is_some_and(|r| r > DENIAL_RATE_THRESHOLD) { 1.0 } else { 0.0 }))
        .collect();
    merged.add_numeric_column(TARGET_COLUMN, target)?;
    merged.add_numeric_column(CLAIM_DENIAL_RISK, rates)?;

    log::info!(
        "Merged claims: {} of {} feature rows have claims",
        merged.len(),
        features.len()
    );
    Ok(merged)
}
