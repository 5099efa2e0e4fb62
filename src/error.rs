// src/error.rs

//! Unified error handling for batch jobs.

use std::fmt;

use thiserror::Error;

/// Result type alias for firebatch operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The scrape API reported a failure (HTTP status or `success: false`)
    #[error("{0}")]
    Scrape(String),

    /// A document download did not produce the expected payload
    #[error("{0}")]
    Download(String),

    /// The on-disk ledger is in a shape we refuse to write to
    #[error("Ledger integrity error for {path}: {message}")]
    LedgerIntegrity { path: String, message: String },

    /// A run had work to do but every item failed
    #[error("No items could be processed ({failures} failures)")]
    NothingProcessed { failures: usize },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a scrape API error.
    pub fn scrape(message: impl Into<String>) -> Self {
        Self::Scrape(message.into())
    }

    /// Create a download error.
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download(message.into())
    }

    /// Create a ledger integrity error for the given file.
    pub fn ledger(path: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::LedgerIntegrity {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error must stop the whole run rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::LedgerIntegrity { .. } | Self::Io(_)
        )
    }
}
