use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KaiwaError {
    #[error("Invalid role: {0} (expected system, user or assistant)")]
    InvalidRole(String),

    #[error("There is no conversation to save")]
    EmptyHistory,

    #[error("Failed to save transcript {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load transcript {}: {reason}", path.display())]
    Deserialization { path: PathBuf, reason: String },

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Environment variable `{0}` is not set")]
    MissingCredential(String),

    #[error("Document extraction failed: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KaiwaError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    pub fn deserialization(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Deserialization {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Failures a running session recovers from by reporting them.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::MissingCredential(_) | Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, KaiwaError>;
