//! Model info handler

use axum::{extract::State, Json};

use healthscore_core::logic::training::artifacts::MODEL_TYPE;

use crate::models::ModelInfo;
use crate::{AppResult, AppState};

pub async fn info(State(state): State<AppState>) -> AppResult<Json<ModelInfo>> {
    let engine = state.engine()?;
    let status = engine.status();

    Ok(Json(ModelInfo {
        model_type: MODEL_TYPE,
        features: engine.feature_names().len(),
        checksum: status.checksum.clone(),
        engine: status,
        metadata: state.metadata.as_deref().cloned(),
    }))
}
