//! Probability Risk Bands
//!
//! Maps a denial probability to the Low / Medium / High band reported by
//! NPI batch predictions.

use serde::{Deserialize, Serialize};

/// Band cut-offs (exclusive lower bounds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandConfig {
    /// Probability above which a provider is Medium risk
    pub medium_above: f64,

    /// Probability above which a provider is High risk
    pub high_above: f64,

    /// Probability above which the predicted class is positive
    pub decision_threshold: f64,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            medium_above: 0.3,
            high_above: 0.6,
            decision_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BandConfig {
    pub fn band(&self, probability: f64) -> RiskBand {
        if probability > self.high_above {
            RiskBand::High
        } else if probability > self.medium_above {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    /// Positive class when the probability exceeds the decision threshold
    pub fn predicted_class(&self, probability: f64) -> u8 {
        u8::from(probability > self.decision_threshold)
    }

    /// Human-readable summary, e.g. "High risk provider. Probability of issues: 72.5%"
    pub fn interpretation(&self, probability: f64) -> String {
        format!(
            "{} risk provider. Probability of issues: {:.1}%",
            self.band(probability),
            probability * 100.0
        )
    }
}
