//! API Module
//!
//! Command handlers behind the `healthscore` binary. Each returns a
//! serializable value that `main` prints as JSON.
//!
//! Structure:
//! - dashboard.rs: roster views (providers, summary, alerts, forecasts)
//! - scenario.rs: what-if scoring against the service or a local checkpoint

pub mod dashboard;
pub mod scenario;
