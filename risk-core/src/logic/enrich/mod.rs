//! Enrich Module - Claims and payer data joined onto the feature table
//!
//! Both sources are aggregated to one row per NPI and merged onto
//! `hospitals_features.csv`. Claims replace the proxy target with observed
//! denials; UHC transparency-in-coverage rates add `uhc_*` columns.

pub mod claims;
pub mod uhc;


use std::collections::HashMap;

use thiserror::Error;

use crate::logic::dataset::nppes::{normalize_npi, NPI_COLUMN};
use crate::logic::dataset::{DatasetError, Table};

pub use claims::{aggregate_claims, load_claims, merge_claims, ClaimsSummary, CLAIMS_FILE};
pub use uhc::{
    aggregate_rates, load_rates, merge_uhc, parse_mrf, RateRecord, RateSet, UhcSummary, UHC_FILE,
};

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Unsupported rate file {0}: {1}")]
    Unsupported(String, &'static str),

    #[error("No rate records with an NPI in {0}")]
    NoRates(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    /// Keep only feature rows with a match
    Inner,
    /// Keep every feature row; unmatched rows get missing cells
    Left,
}

/// Error listing every required column the table lacks
fn require_columns(table: &Table, required: &[&str]) -> Result<(), EnrichError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EnrichError::MissingColumns(missing))
    }
}

/// Join `right` onto `left` by normalized NPI. Columns present on both sides
/// take the right side's value.
pub fn merge_on_npi(left: &Table, right: &Table, join: Join) -> Result<Table, EnrichError> {
    let left_npi = left.require(NPI_COLUMN)?;
    right.require(NPI_COLUMN)?;

    let mut lookup: HashMap<String, usize> = HashMap::with_capacity(right.len());
    for (i, row) in right.rows().enumerate() {
        if let Some(npi) = row.get(NPI_COLUMN) {
            lookup.entry(normalize_npi(npi)).or_insert(i);
        }
    }

    let added: Vec<(String, usize)> = right
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, h)| h.as_str() != NPI_COLUMN)
        .map(|(i, h)| (h.clone(), i))
        .collect();
    let kept: Vec<(String, usize)> = left
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, h)| !added.iter().any(|(a, _)| a == *h))
        .map(|(i, h)| (h.clone(), i))
        .collect();

    let headers = kept.iter().chain(added.iter()).map(|(h, _)| h.clone()).collect();
    let mut merged = Table::new(headers);

    for row in left.rows() {
        let cells = row.cells();
        let matched = cells[left_npi]
            .as_deref()
            .and_then(|npi| lookup.get(&normalize_npi(npi)))
            .and_then(|&i| right.row(i));

        if matched.is_none() && join == Join::Inner {
            continue;
        }

        let mut out: Vec<Option<String>> = kept.iter().map(|(_, i)| cells[*i].clone()).collect();
        match matched {
            Some(other) => out.extend(added.iter().map(|(_, i)| other.cells()[*i].clone())),
            None => out.extend(added.iter().map(|_| None)),
        }
        merged.push_row(out);
    }

    Ok(merged)
}

/// Sample standard deviation (n - 1); `None` below two values
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Linear-interpolated quantile of the values, `q` in [0, 1]
fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Mean of a numeric column over the rows that have it; 0 when none do
pub fn column_mean(table: &Table, column: &str) -> f64 {
    let values: Vec<f64> = table
        .numeric_column(column)
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .collect();
    mean(&values).unwrap_or(0.0)
}
