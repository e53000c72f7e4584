use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a dataset from being ingested. Always reported before
/// a run can start.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Workbook contains no sheets")]
    NoSheets,

    #[error("{0} contains no data rows")]
    Empty(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
