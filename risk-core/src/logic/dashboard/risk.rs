//! Risk buckets and probability-to-score mapping

use serde::{Deserialize, Serialize};

/// Score at or above which a provider is Low risk
pub const LOW_RISK_FLOOR: f64 = 80.0;

/// Score at or above which a provider is Moderate risk
pub const MODERATE_RISK_FLOOR: f64 = 50.0;

/// Scores never reach the 0/100 extremes
pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 99.0;

/// Score shown when a probability is not a finite number
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Dashboard risk bucket. Higher scores are safer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Moderate,
    Low,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= LOW_RISK_FLOOR {
            RiskLevel::Low
        } else if score >= MODERATE_RISK_FLOOR {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a denial probability into a 1-99 risk score (higher is safer)
pub fn probability_to_score(probability: f64) -> f64 {
    if !probability.is_finite() {
        return NEUTRAL_SCORE;
    }
    let p = probability.clamp(0.0, 1.0);
    (100.0 * (1.0 - p)).clamp(MIN_SCORE, MAX_SCORE)
}
