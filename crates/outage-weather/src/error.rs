//! Weather fetch error types.

use outage_core::{ConfigError, DatabaseError, NetworkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Weather API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed weather response: {0}")]
    Shape(String),

    #[error("Response cache error: {0}")]
    Cache(#[from] DatabaseError),

    #[error("Day cache error for {path}: {message}")]
    DayCache { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message().to_string(),
            Self::Network(e) => e.user_message().to_string(),
            Self::Api { status, .. } => format!("Weather service rejected the request ({})", status),
            Self::Shape(_) => "Weather service returned data in an unexpected shape".to_string(),
            Self::Cache(e) => e.user_message().to_string(),
            Self::DayCache { .. } => "Cached historical data could not be read".to_string(),
            Self::Io(_) => "A file operation failed. Please try again.".to_string(),
        }
    }

    /// Whether retrying the whole fetch later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
