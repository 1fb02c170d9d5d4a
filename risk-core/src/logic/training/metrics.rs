//! Binary classification metrics

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(labels: &[u8], predicted: &[u8]) -> Self {
        let mut cm = Self::default();
        for (&y, &p) in labels.iter().zip(predicted) {
            match (y, p) {
                (1, 1) => cm.true_positive += 1,
                (1, _) => cm.false_negative += 1,
                (_, 1) => cm.false_positive += 1,
                _ => cm.true_negative += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// [[tn, fp], [fn, tp]]
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }
}

/// Metrics for one split. Ranking metrics are `None` when a class is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: Option<f64>,
    pub pr_auc: Option<f64>,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationMetrics {
    pub fn compute(labels: &[u8], probabilities: &[f64], threshold: f64) -> Self {
        let predicted: Vec<u8> = probabilities
            .iter()
            .map(|p| u8::from(*p > threshold))
            .collect();
        let cm = ConfusionMatrix::from_predictions(labels, &predicted);

        let precision = ratio(cm.true_positive, cm.true_positive + cm.false_positive);
        let recall = ratio(cm.true_positive, cm.true_positive + cm.false_negative);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy: ratio(cm.true_positive + cm.true_negative, cm.total()),
            precision,
            recall,
            f1,
            roc_auc: roc_auc(labels, probabilities),
            pr_auc: average_precision(labels, probabilities),
        }
    }
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let pos = labels.iter().filter(|l| **l == 1).count();
    let neg = labels.len() - pos;
    if pos == 0 || neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based; tied block shares the mean rank
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] == 1 {
                rank_sum += mean_rank;
            }
        }
        i = j + 1;
    }

    let pos_f = pos as f64;
    Some((rank_sum - pos_f * (pos_f + 1.0) / 2.0) / (pos_f * neg as f64))
}

/// Average precision: sum over score thresholds of (R_n - R_{n-1}) * P_n
pub fn average_precision(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let pos = labels.iter().filter(|l| **l == 1).count();
    if pos == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut prev_recall = 0.0;
    let mut ap = 0.0;
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if labels[order[i]] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let precision = tp as f64 / (tp + fp) as f64;
        let recall = tp as f64 / pos as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }
    Some(ap)
}
