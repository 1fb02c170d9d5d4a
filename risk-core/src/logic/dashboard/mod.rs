//! Dashboard Module - Provider risk views
//!
//! Presentation state for hospital network partners: the provider roster,
//! text filtering, risk buckets, aggregates, forecasts and alerts. Everything
//! here is recomputed on demand from the in-memory roster.

pub mod alerts;
pub mod filter;
pub mod forecast;
pub mod provider;
pub mod risk;
pub mod roster;
pub mod summary;

#[cfg(test)]
mod tests;

use thiserror::Error;

// Re-export common types
pub use alerts::{alerts, Alert, AlertConfig, AlertKind, AlertSeverity};
pub use filter::{filter_providers, ProviderQuery};
pub use forecast::{Forecast, Trend};
pub use provider::Provider;
pub use risk::{probability_to_score, RiskLevel};
pub use roster::{load_roster, mock_roster};
pub use summary::{BucketCounts, DashboardSummary};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Failed to read roster: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid roster: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid provider {key}: {reason}")]
    InvalidProvider { key: String, reason: String },
}
