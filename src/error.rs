//! Error types for loading and querying case data.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovidError {
    #[error("data file not found: {}", .0.display())]
    DataFileNotFound(PathBuf),

    /// Country name has no rows in the joined dataset (exact match only)
    #[error("unknown country: {0}")]
    UnknownCountry(String),

    #[error("dataset is empty after joining cases with population")]
    EmptyDataset,

    /// Running average window is 0 or longer than the series
    #[error("invalid window size {window} for series of length {len}")]
    InvalidWindowSize { window: usize, len: usize },

    #[error("no population data for year {0}")]
    NoPopulationForYear(i32),

    #[error("{file}: missing column '{column}'")]
    MissingColumn { file: String, column: String },

    #[error("{file}:{line}: {message}")]
    InvalidRecord {
        file: String,
        line: u64,
        message: String,
    },

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CovidError>;
