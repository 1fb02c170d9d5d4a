//! Booster hyperparameters handed to the external trainer

use serde::{Deserialize, Serialize};

/// Weight reduction applied when the trainer oversamples with SMOTE
const SMOTE_WEIGHT_FACTOR: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub objective: String,
    pub eval_metric: String,
    pub max_depth: u32,
    pub learning_rate: f64,
    pub n_estimators: u32,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub min_child_weight: f64,
    pub gamma: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub scale_pos_weight: f64,
    pub early_stopping_rounds: u32,
    pub random_state: u64,
    /// Oversample the minority class to this share before fitting
    pub smote_ratio: Option<f64>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            objective: "binary:logistic".to_string(),
            eval_metric: "auc".to_string(),
            max_depth: 6,
            learning_rate: 0.1,
            n_estimators: 200,
            subsample: 0.8,
            colsample_bytree: 0.8,
            min_child_weight: 3.0,
            gamma: 0.1,
            reg_alpha: 0.1,
            reg_lambda: 1.0,
            scale_pos_weight: 1.0,
            early_stopping_rounds: 20,
            random_state: super::split::DEFAULT_SEED,
            smote_ratio: Some(0.05),
        }
    }
}

/// neg/pos ratio, or 1 when class weights are off or there are no positives.
/// SMOTE already rebalances, so the weight is scaled down (never below 1).
pub fn scale_pos_weight(labels: &[u8], use_class_weights: bool, use_smote: bool) -> f64 {
    let pos = labels.iter().filter(|l| **l == 1).count();
    let neg = labels.len() - pos;

    let ratio = if pos > 0 { neg as f64 / pos as f64 } else { 1.0 };
    let weight = if use_class_weights { ratio } else { 1.0 };

    if use_smote && pos > 0 {
        (weight * SMOTE_WEIGHT_FACTOR).max(1.0)
    } else {
        weight
    }
}

impl TrainingParams {
    pub fn for_labels(labels: &[u8], use_class_weights: bool, use_smote: bool) -> Self {
        Self {
            scale_pos_weight: scale_pos_weight(labels, use_class_weights, use_smote),
            smote_ratio: if use_smote { Some(0.05) } else { None },
            ..Default::default()
        }
    }
}
