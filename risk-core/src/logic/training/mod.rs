//! Training Module - Model preparation, evaluation and batch prediction
//!
//! Boosting itself runs in an external trainer. This module builds the design
//! matrix and splits it reads, evaluates the checkpoint it writes back, keeps
//! the timestamped artifacts and scores providers by NPI.

pub mod artifacts;
pub mod encode;
pub mod evaluate;
pub mod metrics;
pub mod params;
pub mod predict;
pub mod prepare;
pub mod split;

#[cfg(test)]
mod tests;

use thiserror::Error;

use crate::logic::dataset::DatasetError;
use crate::logic::model::ModelError;

// Re-export common types
pub use artifacts::{
    checkpoint_path, latest_artifact, load_latest_encoders, load_latest_metadata, save_artifacts,
    ModelMetadata, SavedArtifacts,
};
pub use encode::{LabelEncoder, LabelEncoders};
pub use evaluate::{evaluate, EvaluationReport, EvaluationSet, FeatureImportance, SplitMetrics};
pub use metrics::{ClassificationMetrics, ConfusionMatrix};
pub use params::TrainingParams;
pub use predict::{
    predict_indexed, predict_npis, prediction_columns, write_predictions, FeatureTable, NpiIndex,
    NpiPrediction, PREDICTIONS_FILE,
};
pub use prepare::{prepare_data, PreparedData};
pub use split::Splits;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Target must be 0 or 1 (row {row})")]
    InvalidTarget { row: usize },

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("No model artifacts found in {0}")]
    NoArtifacts(String),

    #[error("None of the requested NPIs were found")]
    NoMatchingNpis,
}
