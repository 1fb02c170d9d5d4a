//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden from the environment (or a `.env` file).

/// Default scoring API URL
///
/// For development: http://localhost:8000
pub const DEFAULT_SCORING_API_URL: &str = "http://localhost:8000";

/// Default directory for processed pipeline data
pub const DEFAULT_DATA_DIR: &str = "./data/processed";

/// Default directory for model artifacts
pub const DEFAULT_MODELS_DIR: &str = "./models";

/// Default directory holding the NPPES dissemination files
pub const DEFAULT_NPPES_DATA_PATH: &str = "./data/raw";

/// Default NPPES provider file name
pub const DEFAULT_NPI_FILE: &str = "npidata_pfile.csv";

/// Default debounce window for scenario edits (milliseconds)
pub const DEFAULT_SCENARIO_DEBOUNCE_MS: u64 = 350;

/// Default HTTP timeout for the scoring client (seconds)
pub const DEFAULT_SCORING_TIMEOUT_SECS: u64 = 10;

/// Model name sent with prediction requests
pub const DEFAULT_MODEL_NAME: &str = "xgboost-denial-risk";

/// Number of contributing factors returned with a prediction
pub const DEFAULT_TOP_K: usize = 5;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "HealthScore";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get scoring API URL from environment or use default
pub fn get_scoring_api_url() -> String {
    std::env::var("SCORING_API_URL")
        .unwrap_or_else(|_| DEFAULT_SCORING_API_URL.to_string())
}

/// Get processed data directory from environment or use default
pub fn get_data_dir() -> String {
    std::env::var("DATA_DIR")
        .unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string())
}

/// Get model artifact directory from environment or use default
pub fn get_models_dir() -> String {
    std::env::var("MODELS_DIR")
        .unwrap_or_else(|_| DEFAULT_MODELS_DIR.to_string())
}

/// Get NPPES dissemination directory from environment or use default
pub fn get_nppes_data_path() -> String {
    std::env::var("NPPES_DATA_PATH")
        .unwrap_or_else(|_| DEFAULT_NPPES_DATA_PATH.to_string())
}

/// Get NPPES provider file name from environment or use default
pub fn get_npi_file() -> String {
    std::env::var("NPI_FILE")
        .unwrap_or_else(|_| DEFAULT_NPI_FILE.to_string())
}

/// Get scenario debounce window from environment or use default
pub fn get_scenario_debounce_ms() -> u64 {
    std::env::var("SCENARIO_DEBOUNCE_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SCENARIO_DEBOUNCE_MS)
}

/// Get scoring client timeout from environment or use default
pub fn get_scoring_timeout_secs() -> u64 {
    std::env::var("SCORING_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SCORING_TIMEOUT_SECS)
}
