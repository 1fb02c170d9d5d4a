//! HealthScore API Server
//!
//! Denial-risk scoring and dashboard backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HEALTHSCORE API                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────────┐  ┌──────────────────┐ │
//! │  │  Router   │  │ PredictionEngine │  │ Dashboard roster │ │
//! │  │  (Axum)   │  │ (XGBoost JSON)   │  │ (in memory)      │ │
//! │  └─────┬─────┘  └────────┬─────────┘  └────────┬─────────┘ │
//! │        └─────────────────┼─────────────────────┘           │
//! │                          ▼                                 │
//! │          feature table / encoders / metadata (files)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod models;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use healthscore_core::logic::dashboard::{load_roster, mock_roster, Provider};
use healthscore_core::logic::dataset::Table;
use healthscore_core::logic::model::PredictionEngine;
use healthscore_core::logic::training::{
    load_latest_encoders, load_latest_metadata, FeatureTable, LabelEncoders, ModelMetadata,
};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "healthscore_api=debug,tower_http=debug".into());
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("HealthScore API starting ({})...", config.environment);

    let state = AppState::load(config.clone())?;
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub engine: Option<Arc<PredictionEngine>>,
    pub encoders: Arc<LabelEncoders>,
    pub metadata: Option<Arc<ModelMetadata>>,
    /// Engineered features, indexed by NPI
    pub features: Option<Arc<FeatureTable>>,
    /// Processed registry rows for name search
    pub directory: Option<Arc<Table>>,
    pub providers: Arc<Vec<Provider>>,
}

fn load_table(path: &str, what: &str) -> Option<Table> {
    match Table::read_csv(path, None) {
        Ok(table) => {
            tracing::info!("Loaded {} ({} rows) from {}", what, table.len(), path);
            Some(table)
        }
        Err(e) => {
            tracing::warn!("{} unavailable: {}", what, e);
            None
        }
    }
}

fn load_features(path: &str) -> Option<Arc<FeatureTable>> {
    let table = load_table(path, "Feature table")?;
    match FeatureTable::new(table) {
        Ok(features) => {
            tracing::info!("Indexed {} NPIs", features.index().len());
            Some(Arc::new(features))
        }
        Err(e) => {
            tracing::warn!("Feature table unusable: {}", e);
            None
        }
    }
}

impl AppState {
    /// Load everything the configuration points at. A missing model or data
    /// file leaves that part unavailable; a broken roster file is fatal.
    pub fn load(config: config::Config) -> anyhow::Result<Self> {
        let engine = match PredictionEngine::load(&config.model_path) {
            Ok(engine) => Some(Arc::new(engine)),
            Err(e) => {
                tracing::warn!("Model not loaded: {}", e);
                None
            }
        };

        let models_dir = Path::new(&config.models_dir);
        let encoders = load_latest_encoders(models_dir)?;
        let metadata = load_latest_metadata(models_dir)?.map(Arc::new);

        let providers = match &config.providers_path {
            Some(path) => load_roster(path)?,
            None => mock_roster(),
        };
        tracing::info!("Dashboard roster: {} providers", providers.len());

        Ok(Self {
            engine,
            encoders: Arc::new(encoders),
            metadata,
            features: load_features(&config.features_path),
            directory: load_table(&config.processed_path, "Processed registry").map(Arc::new),
            providers: Arc::new(providers),
            config,
        })
    }

    /// The loaded engine, or a 500 naming the problem
    pub fn engine(&self) -> AppResult<&Arc<PredictionEngine>> {
        self.engine
            .as_ref()
            .ok_or_else(|| AppError::ModelError("Model not initialized".to_string()))
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Scoring service routes
    let scoring_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/predict/npi", post(handlers::predict::predict_npi))
        .route("/predict/batch", post(handlers::predict::predict_batch))
        .route("/model/info", get(handlers::model::info))
        .route("/providers/search", get(handlers::providers::search));

    // Dashboard routes
    let dashboard_routes = Router::new()
        .route("/api/v1/dashboard/providers", get(handlers::dashboard::providers))
        .route("/api/v1/dashboard/summary", get(handlers::dashboard::summary))
        .route("/api/v1/dashboard/alerts", get(handlers::dashboard::list_alerts))
        .route("/api/v1/dashboard/forecasts", get(handlers::dashboard::forecasts))
        .route(
            "/api/v1/dashboard/providers/:key/scenario",
            post(handlers::dashboard::scenario),
        );

    // Combine all routes
    Router::new()
        .merge(scoring_routes)
        .merge(dashboard_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
