//! Scoring API Client
//!
//! HTTP client for the HealthScore prediction service.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::model::{PredictRequest, PredictionEngine, PredictionResult};

/// Scoring service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Number of contributing factors requested from in-process engines
    pub top_k: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        use crate::constants;

        Self {
            base_url: constants::get_scoring_api_url(),
            timeout_seconds: constants::get_scoring_timeout_secs(),
            top_k: constants::DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {0}")]
    Server(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Model error: {0}")]
    Model(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: i64,
    #[serde(default)]
    pub model_loaded: bool,
}

/// Anything that turns a feature map into a denial probability
pub trait Scorer: Send + Sync + 'static {
    fn score(
        &self,
        request: PredictRequest,
    ) -> impl Future<Output = Result<PredictionResult, ScoringError>> + Send;
}

/// Remote scorer
pub struct ScoringClient {
    config: ScoringConfig,
    http_client: reqwest::Client,
}

impl ScoringClient {
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ScoringError::Network(e.to_string()))?;

        Ok(Self { config, http_client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check server health
    pub async fn health(&self) -> Result<HealthResponse, ScoringError> {
        let response = self
            .http_client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| ScoringError::Network(e.to_string()))?;

        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| ScoringError::Parse(e.to_string()))
        } else {
            Err(ScoringError::Server(response.status().as_u16()))
        }
    }

    /// Score one provider's feature map
    pub async fn predict(&self, request: &PredictRequest) -> Result<PredictionResult, ScoringError> {
        log::debug!(
            "Scoring {} ({} features) via {}",
            request.provider_key,
            request.features.len(),
            self.config.base_url
        );

        let response = self
            .http_client
            .post(self.url("/predict"))
            .json(request)
            .send()
            .await
            .map_err(|e| ScoringError::Network(e.to_string()))?;

        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| ScoringError::Parse(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            log::warn!("Scoring failed ({}): {}", status, error_text);
            Err(ScoringError::Server(status))
        }
    }
}

impl Scorer for ScoringClient {
    async fn score(&self, request: PredictRequest) -> Result<PredictionResult, ScoringError> {
        self.predict(&request).await
    }
}

/// In-process scoring against a loaded checkpoint
pub struct LocalScorer {
    engine: std::sync::Arc<PredictionEngine>,
    top_k: usize,
}

impl LocalScorer {
    pub fn new(engine: std::sync::Arc<PredictionEngine>, top_k: usize) -> Self {
        Self { engine, top_k }
    }
}

impl Scorer for LocalScorer {
    async fn score(&self, request: PredictRequest) -> Result<PredictionResult, ScoringError> {
        let result = self.engine.score_request(&request, self.top_k);
        if result.denial_probability.is_finite() {
            Ok(result)
        } else {
            Err(ScoringError::Model("non-finite probability".to_string()))
        }
    }
}
