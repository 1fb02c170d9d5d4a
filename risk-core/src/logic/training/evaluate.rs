//! Checkpoint evaluation on held-out data

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::metrics::{ClassificationMetrics, ConfusionMatrix};
use super::TrainingError;
use crate::logic::model::Booster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitMetrics {
    pub train: ClassificationMetrics,
    pub test: ClassificationMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub metrics: SplitMetrics,
    pub test_confusion_matrix: ConfusionMatrix,
    pub feature_importance: Vec<FeatureImportance>,
    pub best_iteration: Option<usize>,
    pub best_score: Option<f64>,
}

pub struct EvaluationSet<'a> {
    pub features: &'a Array2<f32>,
    pub labels: &'a [u8],
}

/// Score train and test splits with the checkpoint's best iteration.
/// `feature_columns` names the matrix columns when the checkpoint has none.
pub fn evaluate(
    booster: &Booster,
    train: EvaluationSet<'_>,
    test: EvaluationSet<'_>,
    feature_columns: &[String],
    threshold: f64,
) -> Result<EvaluationReport, TrainingError> {
    for set in [&train, &test] {
        if set.features.ncols() < booster.num_features() {
            return Err(TrainingError::Shape(format!(
                "model expects {} features, matrix has {}",
                booster.num_features(),
                set.features.ncols()
            )));
        }
    }

    let iteration = booster.best_iteration();
    let train_proba = booster.predict_batch(train.features.view(), iteration);
    let test_proba = booster.predict_batch(test.features.view(), iteration);

    let test_predicted: Vec<u8> = test_proba
        .iter()
        .map(|p| u8::from(*p > threshold))
        .collect();

    let named = !booster.feature_names().is_empty();
    let feature_importance = booster
        .feature_importance()
        .into_iter()
        .map(|(name, importance)| {
            let feature = if named {
                name
            } else {
                // "f3" -> the prepared column name
                name.strip_prefix('f')
                    .and_then(|i| i.parse::<usize>().ok())
                    .and_then(|i| feature_columns.get(i).cloned())
                    .unwrap_or(name)
            };
            FeatureImportance { feature, importance }
        })
        .collect();

    let report = EvaluationReport {
        metrics: SplitMetrics {
            train: ClassificationMetrics::compute(train.labels, &train_proba, threshold),
            test: ClassificationMetrics::compute(test.labels, &test_proba, threshold),
        },
        test_confusion_matrix: ConfusionMatrix::from_predictions(test.labels, &test_predicted),
        feature_importance,
        best_iteration: booster.best_iteration(),
        best_score: booster.best_score(),
    };

    log::info!(
        "Test accuracy {:.4}, F1 {:.4}, ROC AUC {}",
        report.metrics.test.accuracy,
        report.metrics.test.f1,
        report
            .metrics
            .test
            .roc_auc
            .map_or("n/a".to_string(), |v| format!("{:.4}", v))
    );
    Ok(report)
}
