//! Model Module - Denial-risk inference
//!
//! Native evaluation of the XGBoost checkpoint produced by the training job.
//! Parsing, explanation and scoring live apart so each can be swapped.

pub mod booster;
pub mod inference;
pub mod threshold;
pub mod types;
pub mod vector;

mod shap;

// Re-export common types
pub use booster::{Booster, ModelError};
pub use inference::{EngineStatus, PredictionEngine, Scored};
pub use threshold::{BandConfig, RiskBand};
pub use types::{PredictRequest, PredictionResult, TopFactor};
pub use vector::{FeatureVectorizer, EXPECTED_FEATURES};
