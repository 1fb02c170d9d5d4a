//! Scenario commands

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use healthscore_core::constants;
use healthscore_core::logic::dashboard::Provider;
use healthscore_core::logic::model::PredictionEngine;
use healthscore_core::logic::scenario::{
    LocalScorer, ScenarioOutcome, ScenarioSimulator, Scorer, ScoringClient, ScoringConfig,
};

/// Where scenario edits get scored
#[derive(Debug, Clone)]
pub enum ScorerSource {
    Remote(ScoringConfig),
    Local(PathBuf),
}

/// Replay `edits` through a simulator, as slider moves would, and return the
/// settled outcome. No edits scores the provider's own features.
pub async fn simulate(
    provider: &Provider,
    edits: &[(String, f64)],
    source: ScorerSource,
) -> Result<ScenarioOutcome> {
    let debounce = Duration::from_millis(constants::get_scenario_debounce_ms());

    match source {
        ScorerSource::Remote(config) => {
            let client = ScoringClient::new(config)?;
            run(Arc::new(client), provider, edits, debounce).await
        }
        ScorerSource::Local(model_path) => {
            let engine = PredictionEngine::load(&model_path)
                .with_context(|| format!("loading {}", model_path.display()))?;
            let scorer = LocalScorer::new(Arc::new(engine), constants::DEFAULT_TOP_K);
            run(Arc::new(scorer), provider, edits, debounce).await
        }
    }
}

async fn run<S: Scorer>(
    scorer: Arc<S>,
    provider: &Provider,
    edits: &[(String, f64)],
    debounce: Duration,
) -> Result<ScenarioOutcome> {
    let sim = ScenarioSimulator::spawn(scorer, provider, debounce);
    if edits.is_empty() {
        sim.reset();
    }
    for (name, value) in edits {
        sim.set_feature(name.clone(), *value);
    }

    let state = sim.settled().await;
    match (state.result, state.error) {
        (Some(outcome), None) => Ok(outcome),
        (_, Some(message)) => Err(anyhow!(message)),
        (None, None) => Err(anyhow!("scenario for {} was not scored", provider.key)),
    }
}

/// `name=value` pairs from the command line
pub fn parse_edits(raw: &[String]) -> Result<Vec<(String, f64)>> {
    raw.iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("expected name=value, got '{}'", pair))?;
            let value: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("invalid value for {}", name))?;
            Ok((name.trim().to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edits() {
        let edits = parse_edits(&["num_licenses=2".to_string(), " days_since_update = 30".to_string()])
            .unwrap();
        assert_eq!(
            edits,
            vec![
                ("num_licenses".to_string(), 2.0),
                ("days_since_update".to_string(), 30.0)
            ]
        );
        assert!(parse_edits(&["oops".to_string()]).is_err());
        assert!(parse_edits(&["a=b".to_string()]).is_err());
    }
}
