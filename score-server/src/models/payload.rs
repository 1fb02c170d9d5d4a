//! Request bodies and query parameters

use std::collections::BTreeMap;

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use validator::Validate;

use healthscore_core::logic::model::PredictRequest;

use crate::AppError;

/// JSON body that is deserialized and validated; both failures are 400s
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::ValidationError(e.body_text()))?;
        value
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        Ok(ValidatedJson(value))
    }
}

/// `POST /predict`
#[derive(Debug, Deserialize, Validate)]
pub struct PredictPayload {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub best_iteration: Option<usize>,
    #[validate(length(min = 1, message = "provider_key must not be empty"))]
    pub provider_key: String,
    pub features: BTreeMap<String, f64>,
}

impl From<PredictPayload> for PredictRequest {
    fn from(p: PredictPayload) -> Self {
        let mut request = PredictRequest::new(p.provider_key, p.features);
        if let Some(model) = p.model {
            request.model = model;
        }
        request.best_iteration = p.best_iteration;
        request
    }
}

/// An NPI sent as text or as a JSON number
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Npi {
    Text(String),
    Number(u64),
}

impl From<Npi> for String {
    fn from(npi: Npi) -> Self {
        match npi {
            Npi::Text(npi) => npi,
            Npi::Number(npi) => npi.to_string(),
        }
    }
}

/// One NPI or a list of them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NpiList {
    One(Npi),
    Many(Vec<Npi>),
}

impl NpiList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            NpiList::One(npi) => vec![npi.into()],
            NpiList::Many(npis) => npis.into_iter().map(String::from).collect(),
        }
    }
}

/// `POST /predict/npi`
#[derive(Debug, Deserialize, Validate)]
pub struct NpiPayload {
    pub npi: NpiList,
}

/// `POST /predict/batch`
#[derive(Debug, Deserialize, Validate)]
pub struct BatchPayload {
    #[validate(length(min = 1, message = "npis must not be empty"))]
    pub npis: Vec<Npi>,
}

impl BatchPayload {
    pub fn npis(self) -> Vec<String> {
        self.npis.into_iter().map(String::from).collect()
    }
}

/// `POST /api/v1/dashboard/providers/:key/scenario`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ScenarioPayload {
    /// Feature overrides applied over the provider's own values
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

/// `GET /providers/search`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
