//! Roster aggregates for the overview cards

use serde::{Deserialize, Serialize};

use super::alerts::{alerts, AlertConfig};
use super::provider::Provider;
use super::risk::RiskLevel;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
}

impl BucketCounts {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Moderate => self.moderate += 1,
            RiskLevel::High => self.high += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.moderate + self.high
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub provider_count: usize,
    pub average_risk_score: f64,
    pub average_historical_denial_rate: f64,
    pub average_predicted_denial_rate: f64,
    pub buckets: BucketCounts,
    pub alert_count: usize,
}

impl DashboardSummary {
    pub fn compute(providers: &[Provider], config: &AlertConfig) -> Self {
        if providers.is_empty() {
            return Self::default();
        }

        let n = providers.len() as f64;
        let mut buckets = BucketCounts::default();
        let mut score_sum = 0.0;
        let mut historical_sum = 0.0;
        let mut predicted_sum = 0.0;

        for p in providers {
            buckets.record(p.risk_level());
            score_sum += p.risk_score;
            historical_sum += p.historical_denial_rate;
            predicted_sum += p.predicted_denial_rate;
        }

        Self {
            provider_count: providers.len(),
            average_risk_score: score_sum / n,
            average_historical_denial_rate: historical_sum / n,
            average_predicted_denial_rate: predicted_sum / n,
            buckets,
            alert_count: alerts(providers, config).len(),
        }
    }
}
