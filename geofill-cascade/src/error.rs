//! Error types for geofill-cascade
//!
//! Per-photo failures never surface here: they are recorded in the outcome
//! ledger. `CascadeError` covers run-level failures only (configuration,
//! unusable input, unreadable folders, report output).

use thiserror::Error;

use crate::services::ScanError;

/// Run-level error
#[derive(Debug, Error)]
pub enum CascadeError {
    /// Configuration unusable (exiftool missing, bad settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Plan or other user input unusable
    #[error("Invalid input: {0}")]
    Input(String),

    /// Folder could not be scanned
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// CSV report could not be written
    #[error("Report error: {0}")]
    Report(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared configuration layer error
    #[error(transparent)]
    Common(#[from] geofill_common::Error),
}

/// Result type for run-level operations
pub type CascadeResult<T> = Result<T, CascadeError>;
