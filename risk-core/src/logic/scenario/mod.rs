//! Scenario Module - What-if scoring
//!
//! Debounced feature edits scored by a remote service or a local engine.

pub mod client;
pub mod simulator;


pub use client::{HealthResponse, LocalScorer, Scorer, ScoringClient, ScoringConfig, ScoringError};
pub use simulator::{score_scenario, ScenarioOutcome, ScenarioSimulator, ScenarioState};

/// Shown to the user whenever a scoring call fails
pub const SCORING_FAILED_MESSAGE: &str = "Unable to score this scenario right now. Please try again.";
