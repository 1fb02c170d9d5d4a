//! Dashboard commands

use std::path::Path;

use serde::Serialize;

use healthscore_core::logic::dashboard::{
    alerts, load_roster, mock_roster, Alert, AlertConfig, DashboardError, DashboardSummary,
    Forecast, Provider, ProviderQuery, RiskLevel,
};

/// One row of the provider table
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRow {
    pub key: String,
    pub name: String,
    pub city: String,
    pub specialty: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

impl From<&Provider> for ProviderRow {
    fn from(p: &Provider) -> Self {
        Self {
            key: p.key.clone(),
            name: p.name.clone(),
            city: p.city.clone(),
            specialty: p.specialty.clone(),
            risk_score: p.risk_score,
            risk_level: p.risk_level(),
        }
    }
}

/// Roster file when given, otherwise the built-in mock roster
pub fn roster(path: Option<&Path>) -> Result<Vec<Provider>, DashboardError> {
    match path {
        Some(path) => load_roster(path),
        None => Ok(mock_roster()),
    }
}

pub fn get_providers(providers: &[Provider], query: &ProviderQuery) -> Vec<ProviderRow> {
    query.apply(providers).into_iter().map(ProviderRow::from).collect()
}

pub fn get_summary(providers: &[Provider], config: &AlertConfig) -> DashboardSummary {
    DashboardSummary::compute(providers, config)
}

pub fn get_alerts(providers: &[Provider], config: &AlertConfig) -> Vec<Alert> {
    alerts(providers, config)
}

pub fn get_forecasts(providers: &[Provider]) -> Vec<Forecast> {
    providers.iter().map(Provider::forecast).collect()
}
