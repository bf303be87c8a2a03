// SPDX-License-Identifier: MIT

//! Error types for imagehound

use thiserror::Error;

/// Result type alias for imagehound operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Imagehound error types
///
/// Only `Validation` ever aborts a scan; filesystem and network failures on
/// individual images are folded into per-image verdicts at the classifier
/// boundary and never surface through this type during a run.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
