//! Logic Module - Business Logic & Engines
//!
//! - `dashboard/` - Provider roster, risk buckets, summary, forecasts, alerts
//! - `scenario/` - Debounced what-if scoring against the prediction service
//! - `model/` - Native XGBoost checkpoint inference and explanations
//! - `dataset/`, `features/`, `training/` - NPPES batch pipeline pieces
//! - `enrich/` - Claims and UHC rate data merged onto the features
//! - `pipeline` - Stage orchestration over files on disk

pub mod dashboard;
pub mod dataset;
pub mod enrich;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod scenario;
pub mod training;
