pub mod config;
pub mod error;

pub use config::{
    Config, ForecastConfig, GridConfig, HistoricalConfig, HttpCacheConfig, ModelConfig,
    OutputConfig, RateLimitConfig, RetrySettings, ValidationResult,
};
pub use error::{
    ConfigError, DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt,
};

use anyhow::Result;

/// Initialize logging for the outage forecast tools
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::debug!("Outage forecast core initialized");
    Ok(())
}
