use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Summary of all errors joined by `; `
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Forecast source settings
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Historical (archive) source settings
    #[serde(default)]
    pub historical: HistoricalConfig,

    /// Points-per-window rate limit shared by both sources
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Transport retry policy
    #[serde(default)]
    pub retry: RetrySettings,

    /// SQLite response cache
    #[serde(default)]
    pub http_cache: HttpCacheConfig,

    /// Classifier artifact and feature window
    #[serde(default)]
    pub model: ModelConfig,

    /// Location grid input
    #[serde(default)]
    pub grid: GridConfig,

    /// Prediction artifact output
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub url: String,
    /// Locations per request
    pub batch_size: usize,
    /// Forecast horizon in days
    pub forecast_days: u32,
    /// Response cache lifetime in seconds
    pub cache_expire_secs: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            url: "https://api.open-meteo.com/v1/forecast".to_string(),
            batch_size: 100,
            forecast_days: 2,
            cache_expire_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalConfig {
    pub url: String,
    /// Locations per request
    pub batch_size: usize,
    /// Directory holding one `historical_YYYY-MM-DD.csv` per fetched day
    pub cache_dir: PathBuf,
}

impl Default for HistoricalConfig {
    fn default() -> Self {
        Self {
            url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            batch_size: 50,
            cache_dir: PathBuf::from("forecasting"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Points sent before a cooldown is taken
    pub max_points: usize,
    /// Cooldown length in seconds
    pub cooldown_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_points: 500,
            cooldown_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 200,
            max_delay_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCacheConfig {
    pub path: PathBuf,
}

impl Default for HttpCacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".cache_http.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// XGBoost JSON model artifact
    pub path: PathBuf,
    /// Hourly steps per feature vector
    #[serde(default = "default_num_steps")]
    pub num_steps: usize,
    /// Forward-looking window length in hours
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
}

fn default_num_steps() -> usize {
    12
}

fn default_window_hours() -> i64 {
    12
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("xgboost_best_model.json"),
            num_steps: default_num_steps(),
            window_hours: default_window_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// CSV file with `latitude,longitude` rows
    pub path: PathBuf,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/grid.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub predictions_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            predictions_path: PathBuf::from("data/outage_predictions.csv"),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Logs warnings; returns an error if validation fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_url(&self.forecast.url, "forecast.url", &mut result);
        Self::validate_url(&self.historical.url, "historical.url", &mut result);

        if self.forecast.batch_size == 0 {
            result.add_error("forecast.batch_size", "Batch size must be greater than 0");
        }
        if self.historical.batch_size == 0 {
            result.add_error("historical.batch_size", "Batch size must be greater than 0");
        }
        if self.forecast.forecast_days == 0 {
            result.add_error("forecast.forecast_days", "Forecast horizon must be at least 1 day");
        } else if self.forecast.forecast_days > 16 {
            result.add_warning(
                "forecast.forecast_days",
                "Forecast horizon beyond 16 days is not served upstream",
            );
        }

        if self.rate_limit.max_points == 0 {
            result.add_error("rate_limit.max_points", "Point threshold must be greater than 0");
        } else if self.rate_limit.max_points < self.forecast.batch_size.max(self.historical.batch_size)
        {
            result.add_warning(
                "rate_limit.max_points",
                "Threshold is smaller than a batch; a cooldown will follow every batch",
            );
        }
        if self.rate_limit.cooldown_secs == 0 {
            result.add_warning("rate_limit.cooldown_secs", "Rate-limit cooldown disabled (0 seconds)");
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            result.add_error(
                "retry.initial_delay_ms",
                "Initial retry delay exceeds the maximum delay",
            );
        }

        if self.model.num_steps == 0 {
            result.add_error("model.num_steps", "Feature window must contain at least one step");
        }
        if self.model.window_hours <= 0 {
            result.add_error("model.window_hours", "Window length must be positive");
        } else if (self.model.window_hours as usize) < self.model.num_steps {
            result.add_warning(
                "model.window_hours",
                "Window is shorter than the number of hourly steps; no location can be scored",
            );
        }

        if !self.model.path.exists() {
            result.add_warning(
                "model.path",
                format!("Model artifact does not exist: {}", self.model.path.display()),
            );
        }

        result
    }

    fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to a file, creating parent directories
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("outage-forecast");

        Ok(config_dir.join("config.toml"))
    }
}
