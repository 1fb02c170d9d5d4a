//! Provider search

use serde::{Deserialize, Serialize};

use super::provider::Provider;
use super::risk::RiskLevel;

/// Search box text plus the "high risk only" toggle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderQuery {
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    #[serde(default)]
    pub high_risk_only: bool,
}

impl ProviderQuery {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            high_risk_only: false,
        }
    }

    pub fn apply<'a>(&self, providers: &'a [Provider]) -> Vec<&'a Provider> {
        let matched = filter_providers(providers, self.query.as_deref().unwrap_or(""));
        if self.high_risk_only {
            matched
                .into_iter()
                .filter(|p| p.risk_level() == RiskLevel::High)
                .collect()
        } else {
            matched
        }
    }
}

/// Providers whose name, city or specialty contains `query`, ignoring case.
/// An empty query matches everything. Roster order is preserved.
pub fn filter_providers<'a>(providers: &'a [Provider], query: &str) -> Vec<&'a Provider> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return providers.iter().collect();
    }
    providers
        .iter()
        .filter(|p| p.matches_lowercase(&needle))
        .collect()
}
