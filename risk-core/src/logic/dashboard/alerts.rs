//! Derived alerts
//!
//! Alerts are not stored; they fall out of the roster every time it is read.

use serde::{Deserialize, Serialize};

use super::forecast::Forecast;
use super::provider::Provider;
use super::risk::RiskLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Predicted minus historical denial rate that raises a trend alert
    pub trend_threshold: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { trend_threshold: 0.02 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighRisk,
    RisingDenials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub provider_key: String,
    pub provider_name: String,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Critical alerts first, then by provider key
pub fn alerts(providers: &[Provider], config: &AlertConfig) -> Vec<Alert> {
    let mut out = Vec::new();

    for p in providers {
        if p.risk_level() == RiskLevel::High {
            out.push(Alert {
                provider_key: p.key.clone(),
                provider_name: p.name.clone(),
                kind: AlertKind::HighRisk,
                severity: AlertSeverity::Critical,
                message: format!("{} has a risk score of {:.0}", p.name, p.risk_score),
            });
        }

        let forecast = Forecast::for_provider(p);
        if forecast.delta > config.trend_threshold {
            out.push(Alert {
                provider_key: p.key.clone(),
                provider_name: p.name.clone(),
                kind: AlertKind::RisingDenials,
                severity: AlertSeverity::Warning,
                message: format!(
                    "Denials at {} projected to rise from {:.1}% to {:.1}%",
                    p.name,
                    forecast.historical_denial_rate * 100.0,
                    forecast.predicted_denial_rate * 100.0
                ),
            });
        }
    }

    out.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.provider_key.cmp(&b.provider_key))
    });
    out
}
