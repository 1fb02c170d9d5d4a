//! Dataset Module - NPPES registry data
//!
//! Tabular loading and the processing stage that turns the raw dissemination
//! file into `hospitals_processed.csv`.

pub mod nppes;
pub mod table;

#[cfg(test)]
mod tests;

use thiserror::Error;

pub use nppes::{clean, filter_organizations, flag_hospital_taxonomy, parse_date, ProcessSummary};
pub use table::{RowRef, Table};

/// Output of the processing stage
pub const PROCESSED_FILE: &str = "hospitals_processed.csv";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Shape mismatch: {0}")]
    Shape(String),
}
