//! Batch prediction for providers picked by NPI

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::artifacts::ModelMetadata;
use super::encode::LabelEncoders;
use super::prepare::median;
use super::TrainingError;
use crate::logic::dataset::nppes::{normalize_npi, NPI_COLUMN};
use crate::logic::dataset::table::parse_number;
use crate::logic::dataset::Table;
use crate::logic::model::{BandConfig, Booster, RiskBand, EXPECTED_FEATURES};

pub const PREDICTIONS_FILE: &str = "predictions.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpiPrediction {
    pub npi: String,
    pub predicted_risk: f64,
    pub predicted_class: u8,
    pub risk_level: RiskBand,
    pub interpretation: String,
}

/// Columns the booster was fitted on: its own names, then the run metadata,
/// then the production layout.
pub fn prediction_columns(booster: &Booster, metadata: Option<&ModelMetadata>) -> Vec<String> {
    if !booster.feature_names().is_empty() {
        return booster.feature_names().to_vec();
    }
    match metadata {
        Some(m) if !m.feature_cols.is_empty() => m.feature_cols.clone(),
        _ => EXPECTED_FEATURES.iter().map(|s| s.to_string()).collect(),
    }
}

/// First row holding each normalized NPI
#[derive(Debug, Clone, Default)]
pub struct NpiIndex {
    rows: HashMap<String, usize>,
}

impl NpiIndex {
    pub fn build(table: &Table) -> Result<Self, TrainingError> {
        table.require(NPI_COLUMN)?;

        let mut rows = HashMap::with_capacity(table.len());
        for (i, row) in table.rows().enumerate() {
            if let Some(npi) = row.get(NPI_COLUMN) {
                rows.entry(normalize_npi(npi)).or_insert(i);
            }
        }
        Ok(Self { rows })
    }

    pub fn get(&self, npi: &str) -> Option<usize> {
        self.rows.get(&normalize_npi(npi)).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Feature table plus its NPI index, for callers that score repeatedly
#[derive(Debug, Clone)]
pub struct FeatureTable {
    table: Table,
    index: NpiIndex,
}

impl FeatureTable {
    pub fn new(table: Table) -> Result<Self, TrainingError> {
        let index = NpiIndex::build(&table)?;
        Ok(Self { table, index })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn index(&self) -> &NpiIndex {
        &self.index
    }

    pub fn predict(
        &self,
        npis: &[String],
        booster: &Booster,
        columns: &[String],
        encoders: &LabelEncoders,
        bands: &BandConfig,
    ) -> Result<Vec<NpiPrediction>, TrainingError> {
        predict_indexed(&self.table, &self.index, npis, booster, columns, encoders, bands)
    }
}

/// Row index per requested NPI, in request order. Unknown NPIs are skipped.
fn locate_rows(index: &NpiIndex, npis: &[String]) -> Vec<(String, usize)> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for raw in npis {
        let npi = normalize_npi(raw);
        if !seen.insert(npi.clone()) {
            continue;
        }
        match index.get(&npi) {
            Some(row) => found.push((npi, row)),
            None => log::warn!("NPI {} not found in feature table", npi),
        }
    }
    found
}

/// Probability kept to four decimals in reports
fn round_risk(p: f64) -> f64 {
    (p * 10_000.0).round() / 10_000.0
}

/// Design matrix for the selected rows. Categorical columns use the saved
/// encoders (unseen classes map to 0); numeric gaps take the median of the
/// selected rows.
pub fn encode_rows(
    table: &Table,
    rows: &[usize],
    columns: &[String],
    encoders: &LabelEncoders,
) -> Array2<f32> {
    let mut x = Array2::<f32>::zeros((rows.len(), columns.len()));

    for (j, column) in columns.iter().enumerate() {
        if !table.has_column(column) {
            log::debug!("Column {} absent, filled with 0", column);
            continue;
        }

        if let Some(encoder) = encoders.get(column) {
            for (i, &row) in rows.iter().enumerate() {
                x[[i, j]] = encoder.transform_or_zero(table.get(row, column)) as f32;
            }
            continue;
        }

        let values: Vec<Option<f64>> = rows
            .iter()
            .map(|&row| table.get(row, column).and_then(parse_number))
            .collect();
        let fill = median(values.iter().flatten().copied()).unwrap_or(0.0);
        for (i, v) in values.into_iter().enumerate() {
            x[[i, j]] = v.unwrap_or(fill) as f32;
        }
    }
    x
}

/// One-off prediction; builds the NPI index for this call
pub fn predict_npis(
    table: &Table,
    npis: &[String],
    booster: &Booster,
    columns: &[String],
    encoders: &LabelEncoders,
    bands: &BandConfig,
) -> Result<Vec<NpiPrediction>, TrainingError> {
    let index = NpiIndex::build(table)?;
    predict_indexed(table, &index, npis, booster, columns, encoders, bands)
}

pub fn predict_indexed(
    table: &Table,
    index: &NpiIndex,
    npis: &[String],
    booster: &Booster,
    columns: &[String],
    encoders: &LabelEncoders,
    bands: &BandConfig,
) -> Result<Vec<NpiPrediction>, TrainingError> {
    let located = locate_rows(index, npis);
    if located.is_empty() {
        return Err(TrainingError::NoMatchingNpis);
    }

    let rows: Vec<usize> = located.iter().map(|(_, row)| *row).collect();
    let x = encode_rows(table, &rows, columns, encoders);
    let probabilities = booster.predict_batch(x.view(), booster.best_iteration());

    let predictions: Vec<NpiPrediction> = located
        .into_iter()
        .zip(probabilities)
        .map(|((npi, _), p)| NpiPrediction {
            npi,
            predicted_risk: round_risk(p),
            predicted_class: bands.predicted_class(p),
            risk_level: bands.band(p),
            interpretation: bands.interpretation(p),
        })
        .collect();

    log::info!(
        "Predicted {} of {} requested NPIs",
        predictions.len(),
        npis.len()
    );
    Ok(predictions)
}

pub fn write_predictions(
    path: impl AsRef<Path>,
    predictions: &[NpiPrediction],
) -> Result<(), TrainingError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for p in predictions {
        writer.serialize(p)?;
    }
    writer.flush()?;
    log::info!("Wrote {} predictions to {}", predictions.len(), path.display());
    Ok(())
}
