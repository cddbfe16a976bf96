use std::path::PathBuf;

use thiserror::Error;

/// Failures at the document boundary. Anything past opening the document
/// degrades to "no effect" instead of aborting the scan.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to open document {path}: {reason}")]
    DocumentOpen { path: PathBuf, reason: String },

    #[error("unsupported document type: {0} (expected .pdf or .txt)")]
    UnsupportedFormat(String),
}

impl ExtractError {
    pub fn open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ExtractError::DocumentOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
