//! Scoring and pipeline error types.

use outage_core::ConfigError;
use outage_weather::FetchError;
use thiserror::Error;

/// A location's window cannot be turned into a feature vector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("Insufficient data: need {required} hourly rows, have {available}")]
    InsufficientData { required: usize, available: usize },
}

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Failed to read model {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    #[error("Classifier returned an invalid probability: {0}")]
    InvalidOutput(f64),
}

impl PredictError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Io { .. } => "The outage model file could not be read.",
            Self::InvalidModel(_) => "The outage model file is not a supported model.",
            Self::FeatureMismatch(_) => "The outage model expects different inputs.",
            Self::InvalidOutput(_) => "The outage model produced an invalid result.",
        }
    }
}

/// Reading or writing the predictions artifact failed.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Predictions file not found: {0}")]
    NotFound(String),

    #[error("Predictions file {path}: {message}")]
    Csv { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced to callers of the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl PipelineError {
    /// True when the caller sent something unusable (HTTP 400 territory).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// True when running the same command again later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(_) => "Invalid datetime format".to_string(),
            Self::Config(e) => e.user_message().to_string(),
            Self::Fetch(e) => e.user_message(),
            Self::Predict(e) => e.user_message().to_string(),
            Self::Output(_) => "Predictions are not available yet.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invalid_input_is_client_error() {
        assert!(PipelineError::InvalidInput("tomorrow-ish".into()).is_client_error());
        assert!(!PipelineError::Predict(PredictError::InvalidOutput(1.5)).is_client_error());
        assert!(!PipelineError::Fetch(FetchError::Shape("short column".into())).is_client_error());
        assert!(!PipelineError::Config(ConfigError::GridMismatch {
            latitudes: 2,
            longitudes: 1
        })
        .is_client_error());
    }

    #[test]
    fn test_only_transient_fetch_failures_are_retryable() {
        assert!(PipelineError::Fetch(FetchError::Api {
            status: 503,
            message: "busy".into()
        })
        .is_retryable());
        assert!(!PipelineError::Fetch(FetchError::Api {
            status: 400,
            message: "bad latitude".into()
        })
        .is_retryable());
        assert!(!PipelineError::InvalidInput("x".into()).is_retryable());
        assert!(!PipelineError::Predict(PredictError::InvalidOutput(-0.1)).is_retryable());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            PipelineError::InvalidInput("x".into()).user_message(),
            "Invalid datetime format"
        );
        let err = PipelineError::Output(OutputError::NotFound("data/p.csv".into()));
        assert!(err.to_string().contains("data/p.csv"));
    }

    #[test]
    fn test_insufficient_data_display() {
        let err = FeatureError::InsufficientData {
            required: 12,
            available: 7,
        };
        assert_eq!(err.to_string(), "Insufficient data: need 12 hourly rows, have 7");
    }
}
