//! Six-month denial forecast

use serde::{Deserialize, Serialize};

use super::provider::Provider;

/// Changes within this band (one percentage point) count as stable
pub const STABLE_BAND: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Rising,
    Stable,
    Falling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub provider_key: String,
    pub historical_denial_rate: f64,
    pub predicted_denial_rate: f64,
    /// predicted - historical
    pub delta: f64,
    pub trend: Trend,
}

impl Forecast {
    pub fn for_provider(provider: &Provider) -> Self {
        let delta = provider.predicted_denial_rate - provider.historical_denial_rate;
        let trend = if delta > STABLE_BAND {
            Trend::Rising
        } else if delta < -STABLE_BAND {
            Trend::Falling
        } else {
            Trend::Stable
        };

        Self {
            provider_key: provider.key.clone(),
            historical_denial_rate: provider.historical_denial_rate,
            predicted_denial_rate: provider.predicted_denial_rate,
            delta,
            trend,
        }
    }
}
