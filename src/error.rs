//! Error types for the analyzer.

use thiserror::Error;

/// Errors surfaced to callers of the analyzer.
///
/// Only `InvalidInput` stops an analysis before it starts; the other
/// variants are either configuration problems or get folded into the
/// diagnostics of a result.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("front-end failure: {0}")]
    FrontEnd(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("analysis of {path} timed out after {millis} ms")]
    Timeout { path: String, millis: u64 },

    #[error("analysis task failed: {0}")]
    Task(String),
}

impl AnalyzerError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
