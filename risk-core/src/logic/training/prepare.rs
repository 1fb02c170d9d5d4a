//! Feature table -> design matrix

use std::collections::BTreeMap;

use ndarray::Array2;

use super::encode::{LabelEncoder, LabelEncoders};
use super::TrainingError;
use crate::logic::dataset::Table;
use crate::logic::enrich::claims::CLAIMS_EXCLUDED;
use crate::logic::features::TARGET_COLUMN;

/// Identifiers, the target and columns that leak it
pub const EXCLUDED_COLUMNS: [&str; 7] = [
    "NPI",
    "likely_denied",
    "claim_denial_risk",
    "has_deactivation_history",
    "is_deactivated",
    "has_deactivation_date",
    "is_reactivated",
];

#[derive(Debug, Clone)]
pub struct PreparedData {
    /// rows x features
    pub features: Array2<f32>,
    pub target: Vec<u8>,
    pub feature_columns: Vec<String>,
    pub encoders: LabelEncoders,
    /// Imputation value per numeric column
    pub medians: BTreeMap<String, f64>,
}

impl PreparedData {
    pub fn positives(&self) -> usize {
        self.target.iter().filter(|t| **t == 1).count()
    }

    pub fn positive_rate(&self) -> f64 {
        if self.target.is_empty() {
            0.0
        } else {
            self.positives() as f64 / self.target.len() as f64
        }
    }
}

/// Median of the present values; `None` when there are none
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

pub fn feature_columns(table: &Table) -> Vec<String> {
    table
        .headers()
        .iter()
        .filter(|h| {
            let h = h.as_str();
            !EXCLUDED_COLUMNS.contains(&h) && !CLAIMS_EXCLUDED.contains(&h)
        })
        .cloned()
        .collect()
}

fn parse_target(table: &Table) -> Result<Vec<u8>, TrainingError> {
    table.require(TARGET_COLUMN)?;
    table
        .rows()
        .enumerate()
        .map(|(row, r)| match r.get_f64(TARGET_COLUMN) {
            Some(v) if v == 0.0 => Ok(0),
            Some(v) if v == 1.0 => Ok(1),
            _ => Err(TrainingError::InvalidTarget { row }),
        })
        .collect()
}

/// Drop excluded columns, label-encode text columns and fill numeric gaps
/// with the column median.
pub fn prepare_data(table: &Table) -> Result<PreparedData, TrainingError> {
    let target = parse_target(table)?;
    let columns = feature_columns(table);

    let mut features = Array2::<f32>::zeros((table.len(), columns.len()));
    let mut encoders = LabelEncoders::default();
    let mut medians = BTreeMap::new();

    for (j, column) in columns.iter().enumerate() {
        if table.is_numeric_column(column) {
            let values = table.numeric_column(column).unwrap_or_default();
            // All-missing columns impute to 0
            let fill = median(values.iter().flatten().copied()).unwrap_or(0.0);
            medians.insert(column.clone(), fill);
            for (i, v) in values.into_iter().enumerate() {
                features[[i, j]] = v.unwrap_or(fill) as f32;
            }
        } else {
            let cells = table.column(column).unwrap_or_default();
            let encoder = LabelEncoder::fit(cells.iter().copied());
            for (i, cell) in cells.iter().enumerate() {
                features[[i, j]] = encoder.transform_or_zero(*cell) as f32;
            }
            encoders.insert(column.clone(), encoder);
        }
    }

    let prepared = PreparedData {
        features,
        target,
        feature_columns: columns,
        encoders,
        medians,
    };

    log::info!(
        "Prepared {} rows x {} features ({} categorical), target rate {:.2}%",
        prepared.features.nrows(),
        prepared.feature_columns.len(),
        prepared.encoders.0.len(),
        prepared.positive_rate() * 100.0
    );
    Ok(prepared)
}
