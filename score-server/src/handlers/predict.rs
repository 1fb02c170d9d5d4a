//! Prediction handlers

use std::sync::Arc;

use axum::{extract::State, Json};

use healthscore_core::logic::model::{BandConfig, PredictRequest, PredictionResult};
use healthscore_core::logic::training::prediction_columns;

use crate::models::{BatchPayload, NpiPayload, NpiPredictions, PredictPayload, ValidatedJson};
use crate::{AppError, AppResult, AppState};

/// Score one provider's feature map
pub async fn predict(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PredictPayload>,
) -> AppResult<Json<PredictionResult>> {
    let engine = state.engine()?;
    let request: PredictRequest = payload.into();

    let num_trees = engine.booster().num_trees();
    if let Some(it) = request.best_iteration {
        if it >= num_trees {
            return Err(AppError::ValidationError(format!(
                "best_iteration {} out of range (model has {} trees)",
                it, num_trees
            )));
        }
    }

    let result = engine.score_request(&request, state.config.top_k);
    if !result.denial_probability.is_finite() {
        return Err(AppError::ModelError(format!(
            "Scoring produced a non-finite probability for {}",
            request.provider_key
        )));
    }

    tracing::debug!(
        "Scored {}: p={:.4}",
        result.provider_key,
        result.denial_probability
    );
    Ok(Json(result))
}

/// Score providers from the feature table by NPI
pub async fn predict_npi(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<NpiPayload>,
) -> AppResult<Json<NpiPredictions>> {
    score_npis(&state, payload.npi.into_vec()).await
}

pub async fn predict_batch(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<BatchPayload>,
) -> AppResult<Json<NpiPredictions>> {
    score_npis(&state, payload.npis()).await
}

/// Batch scoring is CPU-bound, so it runs on the blocking pool
async fn score_npis(state: &AppState, npis: Vec<String>) -> AppResult<Json<NpiPredictions>> {
    let engine = Arc::clone(state.engine()?);
    let features = state
        .features
        .clone()
        .ok_or_else(|| AppError::Unavailable("Feature table not loaded".to_string()))?;
    let encoders = Arc::clone(&state.encoders);
    let metadata = state.metadata.clone();

    let predictions = tokio::task::spawn_blocking(move || {
        let columns = prediction_columns(engine.booster(), metadata.as_deref());
        features.predict(
            &npis,
            engine.booster(),
            &columns,
            &encoders,
            &BandConfig::default(),
        )
    })
    .await
    .map_err(|e| AppError::InternalError(format!("Prediction task failed: {}", e)))??;

    Ok(Json(predictions.into()))
}
