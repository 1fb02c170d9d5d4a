//! Provider entity

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::forecast::Forecast;
use super::risk::RiskLevel;
use super::DashboardError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub key: String,
    pub name: String,
    pub city: String,
    pub specialty: String,
    /// 0 - 100, higher is safer
    pub risk_score: f64,
    /// Fraction of claims denied historically (0.0 - 1.0)
    pub historical_denial_rate: f64,
    /// Predicted denial rate over the next six months (0.0 - 1.0)
    pub predicted_denial_rate: f64,
    /// Named model inputs
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

impl Provider {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score)
    }

    pub fn forecast(&self) -> Forecast {
        Forecast::for_provider(self)
    }

    /// Case-insensitive substring match on name, city or specialty.
    /// `needle` must already be lowercase.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        [&self.name, &self.city, &self.specialty]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }

    pub fn validate(&self) -> Result<(), DashboardError> {
        let invalid = |reason: &str| DashboardError::InvalidProvider {
            key: self.key.clone(),
            reason: reason.to_string(),
        };

        if self.key.trim().is_empty() {
            return Err(invalid("empty key"));
        }
        if !(0.0..=100.0).contains(&self.risk_score) {
            return Err(invalid("risk score outside 0-100"));
        }
        for rate in [self.historical_denial_rate, self.predicted_denial_rate] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid("denial rate outside 0-1"));
            }
        }
        Ok(())
    }
}
