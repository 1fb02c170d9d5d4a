//! Scenario Simulator
//!
//! Holds one provider's editable feature map. Edits restart a debounce
//! window; when it elapses a single scoring call goes out. An edit that lands
//! while a call is in flight drops that call and starts a fresh window, so
//! only the latest input is ever published.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::client::{Scorer, ScoringError};
use super::SCORING_FAILED_MESSAGE;
use crate::logic::dashboard::{probability_to_score, Provider, RiskLevel};
use crate::logic::model::{PredictRequest, PredictionResult, TopFactor};

/// Scored scenario as shown in the simulator panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub provider_key: String,
    pub probability: f64,
    pub score: f64,
    pub risk_level: RiskLevel,
    pub top_factors: Vec<TopFactor>,
    /// Input revision this outcome was computed from
    pub revision: u64,
}

impl ScenarioOutcome {
    pub fn from_result(result: &PredictionResult, revision: u64) -> Self {
        let score = probability_to_score(result.denial_probability);
        Self {
            provider_key: result.provider_key.clone(),
            probability: result.denial_probability,
            score,
            risk_level: RiskLevel::from_score(score),
            top_factors: result.top_factors.clone().unwrap_or_default(),
            revision,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioState {
    /// Last input revision a scoring attempt finished for
    pub revision: u64,
    /// An edit is waiting out the debounce window or being scored
    pub pending: bool,
    /// Latest successful outcome; survives later failures
    pub result: Option<ScenarioOutcome>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
struct Inputs {
    revision: u64,
    features: BTreeMap<String, f64>,
}

pub struct ScenarioSimulator {
    provider_key: String,
    baseline: BTreeMap<String, f64>,
    inputs: watch::Sender<Inputs>,
    state: watch::Receiver<ScenarioState>,
    task: JoinHandle<()>,
}

impl ScenarioSimulator {
    /// Start a simulator for `provider`. Must be called inside a tokio runtime.
    pub fn spawn<S: Scorer>(scorer: Arc<S>, provider: &Provider, debounce: Duration) -> Self {
        let (inputs_tx, inputs_rx) = watch::channel(Inputs {
            revision: 0,
            features: provider.features.clone(),
        });
        let (state_tx, state_rx) = watch::channel(ScenarioState::default());

        let task = tokio::spawn(run(
            scorer,
            provider.key.clone(),
            inputs_rx,
            state_tx,
            debounce,
        ));

        Self {
            provider_key: provider.key.clone(),
            baseline: provider.features.clone(),
            inputs: inputs_tx,
            state: state_rx,
            task,
        }
    }

    pub fn provider_key(&self) -> &str {
        &self.provider_key
    }

    /// Slider edit
    pub fn set_feature(&self, name: impl Into<String>, value: f64) {
        let name = name.into();
        self.inputs.send_modify(|inputs| {
            inputs.features.insert(name, value);
            inputs.revision += 1;
        });
    }

    /// Back to the provider's own values
    pub fn reset(&self) {
        let baseline = self.baseline.clone();
        self.inputs.send_modify(|inputs| {
            inputs.features = baseline;
            inputs.revision += 1;
        });
    }

    pub fn features(&self) -> BTreeMap<String, f64> {
        self.inputs.borrow().features.clone()
    }

    pub fn revision(&self) -> u64 {
        self.inputs.borrow().revision
    }

    pub fn state(&self) -> ScenarioState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScenarioState> {
        self.state.clone()
    }

    /// Wait until the latest edit has been scored (or has failed)
    pub async fn settled(&self) -> ScenarioState {
        let target = self.revision();
        let mut rx = self.state.clone();
        let settled = rx
            .wait_for(|s| !s.pending && s.revision >= target)
            .await
            .map(|s| s.clone());
        match settled {
            Ok(state) => state,
            // Worker gone; report whatever was last published
            Err(_) => self.state(),
        }
    }
}

impl Drop for ScenarioSimulator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<S: Scorer>(
    scorer: Arc<S>,
    provider_key: String,
    mut inputs: watch::Receiver<Inputs>,
    state: watch::Sender<ScenarioState>,
    debounce: Duration,
) {
    let mut dirty = false;

    loop {
        if !dirty && inputs.changed().await.is_err() {
            return;
        }
        dirty = false;
        state.send_modify(|s| s.pending = true);

        // Debounce: every further edit restarts the window
        loop {
            tokio::select! {
                changed = inputs.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = sleep(debounce) => break,
            }
        }

        let snapshot = inputs.borrow_and_update().clone();
        let request = PredictRequest::new(provider_key.clone(), snapshot.features);

        tokio::select! {
            result = scorer.score(request) => {
                state.send_modify(|s| {
                    s.pending = false;
                    s.revision = snapshot.revision;
                    match result {
                        Ok(result) => {
                            s.result = Some(ScenarioOutcome::from_result(&result, snapshot.revision));
                            s.error = None;
                        }
                        Err(e) => {
                            log::warn!("Scenario scoring failed for {}: {}", provider_key, e);
                            s.error = Some(SCORING_FAILED_MESSAGE.to_string());
                        }
                    }
                });
            }
            changed = inputs.changed() => {
                if changed.is_err() {
                    return;
                }
                log::debug!("Scenario input changed mid-flight; dropping revision {}", snapshot.revision);
                dirty = true;
            }
        }
    }
}

/// Score `provider` once with `overrides` applied over its own features
pub async fn score_scenario<S: Scorer>(
    scorer: &S,
    provider: &Provider,
    overrides: &BTreeMap<String, f64>,
) -> Result<ScenarioOutcome, ScoringError> {
    let mut features = provider.features.clone();
    features.extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));

    let result = scorer
        .score(PredictRequest::new(provider.key.clone(), features))
        .await?;
    Ok(ScenarioOutcome::from_result(&result, 0))
}
