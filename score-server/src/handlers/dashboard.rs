//! Dashboard handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};

use healthscore_core::logic::dashboard::{
    alerts, Alert, AlertConfig, DashboardSummary, Forecast, Provider, ProviderQuery,
};
use healthscore_core::logic::scenario::{
    score_scenario, LocalScorer, ScenarioOutcome, SCORING_FAILED_MESSAGE,
};

use crate::models::{ProviderView, ScenarioPayload, ValidatedJson};
use crate::{AppError, AppResult, AppState};

/// Roster filtered by `q` and `high_risk_only`
pub async fn providers(
    State(state): State<AppState>,
    Query(query): Query<ProviderQuery>,
) -> Json<Vec<ProviderView>> {
    Json(
        query
            .apply(&state.providers)
            .into_iter()
            .map(ProviderView::from)
            .collect(),
    )
}

pub async fn summary(State(state): State<AppState>) -> Json<DashboardSummary> {
    Json(DashboardSummary::compute(
        &state.providers,
        &AlertConfig::default(),
    ))
}

pub async fn list_alerts(State(state): State<AppState>) -> Json<Vec<Alert>> {
    Json(alerts(&state.providers, &AlertConfig::default()))
}

pub async fn forecasts(State(state): State<AppState>) -> Json<Vec<Forecast>> {
    Json(state.providers.iter().map(Provider::forecast).collect())
}

/// Score the provider with the posted feature overrides
pub async fn scenario(
    State(state): State<AppState>,
    Path(key): Path<String>,
    ValidatedJson(payload): ValidatedJson<ScenarioPayload>,
) -> AppResult<Json<ScenarioOutcome>> {
    let provider = state
        .providers
        .iter()
        .find(|p| p.key == key)
        .ok_or_else(|| AppError::NotFound(format!("Provider {} not found", key)))?;

    let scorer = LocalScorer::new(state.engine()?.clone(), state.config.top_k);
    let outcome = score_scenario(&scorer, provider, &payload.features)
        .await
        .map_err(|e| {
            tracing::warn!("Scenario scoring failed for {}: {}", key, e);
            AppError::ModelError(SCORING_FAILED_MESSAGE.to_string())
        })?;

    Ok(Json(outcome))
}
