//! Prediction wire types
//!
//! Shared by the scoring service and its clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MODEL_NAME;

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

/// Scoring request: one provider's named feature values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default = "default_model_name")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_iteration: Option<usize>,
    pub provider_key: String,
    pub features: BTreeMap<String, f64>,
}

impl PredictRequest {
    pub fn new(provider_key: impl Into<String>, features: BTreeMap<String, f64>) -> Self {
        Self {
            model: default_model_name(),
            best_iteration: None,
            provider_key: provider_key.into(),
            features,
        }
    }
}

/// One contributing factor behind a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopFactor {
    pub feature: String,
    pub impact: f64,
}

/// Scoring response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub provider_key: String,
    /// 0.0 - 1.0
    pub denial_probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_factors: Option<Vec<TopFactor>>,
}
