//! UHC transparency-in-coverage rates
//!
//! Reads a local in-network rate file (MRF JSON, or a flat CSV with `NPI`,
//! `service_code`, `negotiated_rate`), aggregates per provider and left-joins
//! onto the features. Providers absent from the file get zeros.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{mean, merge_on_npi, quantile, sample_std, EnrichError, Join};
use crate::logic::dataset::nppes::{normalize_npi, NPI_COLUMN};
use crate::logic::dataset::table::format_number;
use crate::logic::dataset::Table;
use crate::logic::training::prepare::median;

/// Output of the UHC merge
pub const UHC_FILE: &str = "hospitals_with_uhc.csv";

pub const UHC_PREFIX: &str = "uhc_";
pub const SERVICE_CODE: &str = "service_code";
pub const NEGOTIATED_RATE: &str = "negotiated_rate";

pub const TOTAL_RATES: &str = "uhc_total_rates";
pub const UNIQUE_SERVICES: &str = "uhc_unique_services";
pub const RATE_CV: &str = "uhc_rate_cv";
pub const IN_NETWORK: &str = "uhc_in_network";
pub const INCOMPLETE_DATA: &str = "uhc_incomplete_data";
pub const UNUSUAL_PRICING: &str = "uhc_unusual_pricing";

/// In-network providers with fewer rates than this share of the median
/// count are flagged incomplete
const INCOMPLETE_SHARE: f64 = 0.5;
/// Rate CV quantile above which pricing counts as unusual
const UNUSUAL_CV_QUANTILE: f64 = 0.9;

/// One negotiated price for one provider
#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    pub npi: String,
    pub service_code: Option<String>,
    pub negotiated_rate: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RateSet {
    pub records: Vec<RateRecord>,
    /// The source carries prices; without them only counts are produced
    pub priced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UhcSummary {
    pub rate_records: usize,
    pub providers: usize,
    /// Feature rows written; `None` when no feature table existed
    pub merged: Option<usize>,
    pub in_network: Option<usize>,
}

// MRF in-network file, only the fields used here

#[derive(Debug, Deserialize)]
struct MrfFile {
    #[serde(default)]
    in_network: Vec<InNetworkItem>,
    #[serde(default)]
    reporting_structure: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct InNetworkItem {
    #[serde(default)]
    billing_code: Option<Value>,
    #[serde(default)]
    negotiated_rates: Vec<NegotiatedRate>,
}

#[derive(Debug, Deserialize)]
struct NegotiatedRate {
    #[serde(default)]
    provider_groups: Vec<ProviderGroup>,
    #[serde(default)]
    negotiated_prices: Vec<NegotiatedPrice>,
}

#[derive(Debug, Deserialize)]
struct ProviderGroup {
    #[serde(default)]
    npi: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct NegotiatedPrice {
    #[serde(default)]
    negotiated_rate: Option<f64>,
}

/// String or number as text
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Flatten an MRF in-network document: one record per provider per price
pub fn parse_mrf(text: &str, source: &str) -> Result<Vec<RateRecord>, EnrichError> {
    let mrf: MrfFile = serde_json::from_str(text)?;
    if mrf.in_network.is_empty() && mrf.reporting_structure.is_some() {
        return Err(EnrichError::Unsupported(
            source.to_string(),
            "table-of-contents file; download one of its in-network files and pass that",
        ));
    }

    let mut records = Vec::new();
    for item in &mrf.in_network {
        let service_code = item.billing_code.as_ref().and_then(scalar);
        for rate in &item.negotiated_rates {
            for group in &rate.provider_groups {
                for npi in group.npi.iter().filter_map(scalar) {
                    let npi = normalize_npi(&npi);
                    for price in &rate.negotiated_prices {
                        records.push(RateRecord {
                            npi: npi.clone(),
                            service_code: service_code.clone(),
                            negotiated_rate: price.negotiated_rate,
                        });
                    }
                }
            }
        }
    }
    Ok(records)
}

fn rates_from_table(table: &Table) -> Result<RateSet, EnrichError> {
    table.require(NPI_COLUMN)?;
    let records = table
        .rows()
        .filter_map(|row| {
            Some(RateRecord {
                npi: normalize_npi(row.get(NPI_COLUMN)?),
                service_code: row.get(SERVICE_CODE).map(str::to_string),
                negotiated_rate: row.get_f64(NEGOTIATED_RATE),
            })
        })
        .collect();
    Ok(RateSet {
        records,
        priced: table.has_column(NEGOTIATED_RATE),
    })
}

/// Load a local rate file: `.json` as MRF, anything else as CSV
pub fn load_rates(path: impl AsRef<Path>) -> Result<RateSet, EnrichError> {
    let path = path.as_ref();
    let source = path.display().to_string();
    log::info!("Loading UHC rate data from {}", source);

    if source.ends_with(".gz") {
        return Err(EnrichError::Unsupported(source, "decompress the file first"));
    }

    let set = if path.extension().is_some_and(|ext| ext == "json") {
        let text = fs::read_to_string(path)?;
        RateSet {
            records: parse_mrf(&text, &source)?,
            priced: true,
        }
    } else {
        rates_from_table(&Table::read_csv(path, None)?)?
    };

    if set.records.is_empty() {
        return Err(EnrichError::NoRates(source));
    }
    log::info!("Loaded {} rate records", set.records.len());
    Ok(set)
}

#[derive(Debug, Default)]
struct ProviderRates {
    codes: Vec<String>,
    prices: Vec<f64>,
}

/// Rate-count, price and network columns, one row per NPI sorted by NPI
pub fn aggregate_rates(set: &RateSet) -> Table {
    let mut providers: BTreeMap<&str, ProviderRates> = BTreeMap::new();
    for record in &set.records {
        let stats = providers.entry(record.npi.as_str()).or_default();
        if let Some(code) = &record.service_code {
            stats.codes.push(code.clone());
        }
        if let Some(rate) = record.negotiated_rate {
            stats.prices.push(rate);
        }
    }

    let mut headers = vec![NPI_COLUMN, TOTAL_RATES, UNIQUE_SERVICES];
    if set.priced {
        headers.extend([
            "uhc_avg_rate",
            "uhc_rate_std",
            "uhc_min_rate",
            "uhc_max_rate",
            "uhc_rate_count",
            RATE_CV,
        ]);
    }
    headers.push(IN_NETWORK);

    let num = |v: f64| Some(format_number(v));
    let mut out = Table::new(headers.into_iter().map(String::from).collect());
    for (npi, stats) in &providers {
        let unique: BTreeSet<&String> = stats.codes.iter().collect();
        let mut cells = vec![
            Some(npi.to_string()),
            num(stats.codes.len() as f64),
            num(unique.len() as f64),
        ];
        if set.priced {
            let avg = mean(&stats.prices);
            let std = sample_std(&stats.prices);
            let min = stats.prices.iter().copied().reduce(f64::min);
            let max = stats.prices.iter().copied().reduce(f64::max);
            // a single price has no spread
            let cv = match (std, avg) {
                (Some(s), Some(a)) if (s / a).is_finite() => s / a,
                _ => 0.0,
            };
            cells.extend([
                avg.and_then(num),
                std.and_then(num),
                min.and_then(num),
                max.and_then(num),
                num(stats.prices.len() as f64),
                num(cv),
            ]);
        }
        cells.push(num(1.0));
        out.push_row(cells);
    }

    log::info!("Aggregated UHC rates to {} providers", out.len());
    out
}

/// Left join onto the features, zero-fill every `uhc_*` column, then flag
/// thin rate data and unusual pricing among in-network providers
pub fn merge_uhc(features: &Table, provider_rates: &Table) -> Result<Table, EnrichError> {
    let mut merged = merge_on_npi(features, provider_rates, Join::Left)?;

    let uhc_columns: Vec<String> = merged
        .headers()
        .iter()
        .filter(|h| h.starts_with(UHC_PREFIX))
        .cloned()
        .collect();
    for column in &uhc_columns {
        let filled = merged
            .numeric_column(column)
            .unwrap_or_default()
            .into_iter()
            .map(|v| Some(v.unwrap_or(0.0)))
            .collect();
        merged.add_numeric_column(column, filled)?;
    }

    let in_network: Vec<bool> = merged
        .numeric_column(IN_NETWORK)
        .unwrap_or_default()
        .into_iter()
        .map(|v| v == Some(1.0))
        .collect();

    if let Some(totals) = merged.numeric_column(TOTAL_RATES) {
        let network_totals = in_network_values(&in_network, &totals);
        let cutoff = median(network_totals.iter().copied()).map(|m| m * INCOMPLETE_SHARE);
        let flags = flag_rows(&in_network, &totals, |v| cutoff.is_some_and(|c| v < c));
        merged.add_numeric_column(INCOMPLETE_DATA, flags)?;
    }

    if let Some(cvs) = merged.numeric_column(RATE_CV) {
        let threshold = quantile(&in_network_values(&in_network, &cvs), UNUSUAL_CV_QUANTILE);
        let flags = flag_rows(&in_network, &cvs, |v| threshold.is_some_and(|t| v > t));
        merged.add_numeric_column(UNUSUAL_PRICING, flags)?;
    }

    log::info!(
        "Merged UHC rates: {} of {} providers in network",
        in_network.iter().filter(|n| **n).count(),
        merged.len()
    );
    Ok(merged)
}

fn in_network_values(in_network: &[bool], values: &[Option<f64>]) -> Vec<f64> {
    in_network
        .iter()
        .zip(values)
        .filter(|(n, _)| **n)
        .filter_map(|(_, v)| *v)
        .collect()
}

fn flag_rows<F>(in_network: &[bool], values: &[Option<f64>], test: F) -> Vec<Option<f64>>
where
    F: Fn(f64) -> bool,
{
    in_network
        .iter()
        .zip(values)
        .map(|(n, v)| {
            let hit = *n && v.is_some_and(&test);
            Some(if hit { 1.0 } else { 0.0 })
        })
        .collect()
}
