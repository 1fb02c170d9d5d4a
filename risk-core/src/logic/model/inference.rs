//! Inference Engine - Denial-risk scoring
//!
//! Wraps a loaded booster with its vectorizer, checksum and latency counters.
//! Kept separate from the HTTP layer so the same engine serves the API, the
//! CLI and the local scenario simulator.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::booster::{Booster, ModelError};
use super::types::{PredictRequest, PredictionResult, TopFactor};
use super::vector::FeatureVectorizer;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Engine status for the model info endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_loaded: bool,
    pub model_path: String,
    pub checksum: String,
    pub num_trees: usize,
    pub num_features: usize,
    pub best_iteration: Option<usize>,
    pub best_score: Option<f64>,
    pub loaded_at: DateTime<Utc>,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
}

/// Probability plus ranked contributions
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub probability: f64,
    pub top_factors: Vec<TopFactor>,
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug)]
pub struct PredictionEngine {
    booster: Booster,
    vectorizer: FeatureVectorizer,
    model_path: String,
    checksum: String,
    loaded_at: DateTime<Utc>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl PredictionEngine {
    /// Load a checkpoint from disk
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = model_path.as_ref();
        log::info!("Loading denial-risk model from: {}", path.display());

        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        let booster = Booster::from_json_str(&text)?;

        let engine = Self::from_booster(booster, path.display().to_string(), checksum(&bytes));
        log::info!(
            "Model loaded: {} trees, {} features, sha256 {}",
            engine.booster.num_trees(),
            engine.vectorizer.len(),
            &engine.checksum[..12]
        );
        Ok(engine)
    }

    pub fn from_booster(booster: Booster, model_path: String, checksum: String) -> Self {
        let vectorizer = FeatureVectorizer::for_booster(&booster);
        Self {
            booster,
            vectorizer,
            model_path,
            checksum,
            loaded_at: Utc::now(),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    pub fn booster(&self) -> &Booster {
        &self.booster
    }

    pub fn feature_names(&self) -> &[String] {
        self.vectorizer.names()
    }

    /// Score a feature map; `top_k` contributions ranked by absolute impact
    pub fn predict(
        &self,
        features: &BTreeMap<String, f64>,
        top_k: usize,
        iteration: Option<usize>,
    ) -> Scored {
        let start = std::time::Instant::now();

        let x = self.vectorizer.vectorize(features);
        let probability = self.booster.predict(&x, iteration);
        let contributions = self.booster.contributions(&x, iteration);
        let top_factors = rank_factors(self.vectorizer.names(), &contributions, top_k);

        self.latency_sum_us
            .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        Scored { probability, top_factors }
    }

    /// Answer a wire request
    pub fn score_request(&self, request: &PredictRequest, top_k: usize) -> PredictionResult {
        let scored = self.predict(&request.features, top_k, request.best_iteration);
        PredictionResult {
            provider_key: request.provider_key.clone(),
            denial_probability: scored.probability,
            top_factors: Some(scored.top_factors),
        }
    }

    pub fn status(&self) -> EngineStatus {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_loaded: true,
            model_path: self.model_path.clone(),
            checksum: self.checksum.clone(),
            num_trees: self.booster.num_trees(),
            num_features: self.vectorizer.len(),
            best_iteration: self.booster.best_iteration(),
            best_score: self.booster.best_score(),
            loaded_at: self.loaded_at,
            avg_latency_ms: avg,
            inference_count: count,
        }
    }
}

/// Pair contributions with names, drop the bias, sort by |impact| descending
pub fn rank_factors(names: &[String], contributions: &[f64], top_k: usize) -> Vec<TopFactor> {
    let bias = contributions.len().saturating_sub(1);
    let mut pairs: Vec<TopFactor> = names
        .iter()
        .zip(contributions[..bias].iter())
        .map(|(name, &impact)| TopFactor { feature: name.clone(), impact })
        .collect();
    pairs.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));
    pairs.truncate(top_k);
    pairs
}

/// SHA-256 of the checkpoint bytes, hex encoded
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
