// ABOUTME: Error types for task discovery
// ABOUTME: Separates recoverable per-definition failures from hard IO faults

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Malformed task definition '{definition}' in {unit}: {reason}")]
    MalformedTaskDefinition {
        unit: String,
        definition: String,
        reason: String,
    },

    #[error("Malformed task source {unit}: {reason}")]
    MalformedUnit { unit: String, reason: String },

    #[error("Failed to read task source {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoaderError {
    pub fn malformed(
        unit: impl Into<String>,
        definition: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        LoaderError::MalformedTaskDefinition {
            unit: unit.into(),
            definition: definition.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts a load instead of being recorded in the report
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoaderError::Io { .. })
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;
