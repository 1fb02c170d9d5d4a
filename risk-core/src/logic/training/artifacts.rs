//! Timestamped model artifacts
//!
//! Each evaluation run writes `label_encoders_<ts>.json` and
//! `model_metadata_<ts>.json` next to the checkpoint directory. Consumers pick
//! the newest file by modification time.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::encode::LabelEncoders;
use super::evaluate::SplitMetrics;
use super::TrainingError;

pub const ENCODERS_PREFIX: &str = "label_encoders_";
pub const METADATA_PREFIX: &str = "model_metadata_";
pub const CHECKPOINT_DIR: &str = "checkpoints";
pub const CHECKPOINT_FILE: &str = "best_model.json";
pub const MODEL_TYPE: &str = "XGBoost";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub timestamp: String,
    pub feature_cols: Vec<String>,
    pub metrics: SplitMetrics,
    pub model_type: String,
    pub n_features: usize,
    pub best_iteration: Option<usize>,
    pub best_score: Option<f64>,
}

impl ModelMetadata {
    pub fn new(
        feature_cols: Vec<String>,
        metrics: SplitMetrics,
        best_iteration: Option<usize>,
        best_score: Option<f64>,
    ) -> Self {
        Self {
            timestamp: timestamp(),
            n_features: feature_cols.len(),
            feature_cols,
            metrics,
            model_type: MODEL_TYPE.to_string(),
            best_iteration,
            best_score,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrainingError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Paths written by one run
#[derive(Debug, Clone, Serialize)]
pub struct SavedArtifacts {
    pub encoders: PathBuf,
    pub metadata: PathBuf,
}

/// `YYYYmmdd_HHMMSS` in local time
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub fn checkpoint_path(models_dir: impl AsRef<Path>) -> PathBuf {
    models_dir.as_ref().join(CHECKPOINT_DIR).join(CHECKPOINT_FILE)
}

/// Write encoders and metadata sharing the metadata's timestamp
pub fn save_artifacts(
    models_dir: impl AsRef<Path>,
    encoders: &LabelEncoders,
    metadata: &ModelMetadata,
) -> Result<SavedArtifacts, TrainingError> {
    let dir = models_dir.as_ref();
    fs::create_dir_all(dir)?;

    let encoders_path = dir.join(format!("{}{}.json", ENCODERS_PREFIX, metadata.timestamp));
    encoders.save(&encoders_path)?;

    let metadata_path = dir.join(format!("{}{}.json", METADATA_PREFIX, metadata.timestamp));
    fs::write(&metadata_path, serde_json::to_string_pretty(metadata)?)?;

    log::info!(
        "Saved artifacts {} and {}",
        encoders_path.display(),
        metadata_path.display()
    );
    Ok(SavedArtifacts {
        encoders: encoders_path,
        metadata: metadata_path,
    })
}

/// Newest `<prefix>*.json` in `dir` by modification time
pub fn latest_artifact(dir: impl AsRef<Path>, prefix: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;

    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "json")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(prefix))
        })
        .filter_map(|p| {
            let modified = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((modified, p))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, p)| p)
}

/// Timestamp part of an artifact file name
pub fn artifact_timestamp(path: &Path, prefix: &str) -> Option<String> {
    path.file_stem()?
        .to_str()?
        .strip_prefix(prefix)
        .map(str::to_string)
}

/// Encoders matching the newest metadata, else the newest encoders, else empty
pub fn load_latest_encoders(dir: impl AsRef<Path>) -> Result<LabelEncoders, TrainingError> {
    let dir = dir.as_ref();

    let paired = latest_artifact(dir, METADATA_PREFIX)
        .and_then(|m| artifact_timestamp(&m, METADATA_PREFIX))
        .map(|ts| dir.join(format!("{}{}.json", ENCODERS_PREFIX, ts)))
        .filter(|p| p.exists());

    match paired.or_else(|| latest_artifact(dir, ENCODERS_PREFIX)) {
        Some(path) => {
            log::info!("Using label encoders from {}", path.display());
            LabelEncoders::load(path)
        }
        None => {
            log::warn!("No label encoders found in {}", dir.display());
            Ok(LabelEncoders::default())
        }
    }
}

pub fn load_latest_metadata(dir: impl AsRef<Path>) -> Result<Option<ModelMetadata>, TrainingError> {
    match latest_artifact(dir, METADATA_PREFIX) {
        Some(path) => ModelMetadata::load(path).map(Some),
        None => Ok(None),
    }
}
