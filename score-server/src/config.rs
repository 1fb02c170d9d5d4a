//! Configuration module

use std::env;

use healthscore_core::constants;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// XGBoost JSON checkpoint
    pub model_path: String,

    /// Directory holding label encoders and model metadata
    pub models_dir: String,

    /// Engineered feature table used for NPI predictions
    pub features_path: String,

    /// Processed registry table used for provider search by name
    pub processed_path: String,

    /// Dashboard roster JSON; the built-in roster when unset
    pub providers_path: Option<String>,

    /// Contributing factors returned per prediction
    pub top_k: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let models_dir = constants::get_models_dir();
        let data_dir = constants::get_data_dir();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            model_path: env::var("MODEL_PATH")
                .unwrap_or_else(|_| format!("{}/checkpoints/best_model.json", models_dir)),

            features_path: env::var("FEATURES_PATH")
                .unwrap_or_else(|_| format!("{}/hospitals_features.csv", data_dir)),

            processed_path: env::var("PROCESSED_PATH")
                .unwrap_or_else(|_| format!("{}/hospitals_processed.csv", data_dir)),

            providers_path: env::var("PROVIDERS_PATH").ok().filter(|p| !p.is_empty()),

            top_k: env::var("TOP_K")
                .ok()
                .and_then(|k| k.parse().ok())
                .unwrap_or(constants::DEFAULT_TOP_K),

            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            models_dir,
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
