//! Response bodies

use serde::Serialize;

use healthscore_core::logic::dashboard::{Provider, RiskLevel};
use healthscore_core::logic::model::EngineStatus;
use healthscore_core::logic::training::{ModelMetadata, NpiPrediction};

#[derive(Debug, Serialize)]
pub struct NpiPredictions {
    pub predictions: Vec<NpiPrediction>,
    pub count: usize,
}

impl From<Vec<NpiPrediction>> for NpiPredictions {
    fn from(predictions: Vec<NpiPrediction>) -> Self {
        Self {
            count: predictions.len(),
            predictions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model_type: &'static str,
    pub features: usize,
    pub checksum: String,
    pub engine: EngineStatus,
    pub metadata: Option<ModelMetadata>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ProviderMatch {
    pub npi: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub providers: Vec<ProviderMatch>,
    pub count: usize,
}

/// Dashboard provider with its bucket resolved
#[derive(Debug, Serialize)]
pub struct ProviderView {
    #[serde(flatten)]
    pub provider: Provider,
    pub risk_level: RiskLevel,
}

impl From<&Provider> for ProviderView {
    fn from(p: &Provider) -> Self {
        Self {
            risk_level: p.risk_level(),
            provider: p.clone(),
        }
    }
}
