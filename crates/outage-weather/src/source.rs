//! Request construction for the forecast and archive endpoints.

use std::time::Duration;

use chrono::{Days, NaiveDate};
use outage_core::{ConfigError, ForecastConfig, HistoricalConfig};
use url::Url;

use crate::error::FetchError;
use crate::types::Location;
use crate::variables::{
    forecast_variable, historical_request, historical_variable, WeatherVariable, FORECAST_REQUEST,
    VARIABLE_COUNT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    NextDays(u32),
    Day(NaiveDate),
}

/// One configured upstream: where to send requests, how many locations per
/// request, which columns to ask for and what they mean.
#[derive(Debug, Clone)]
pub struct WeatherSource {
    base_url: Url,
    batch_size: usize,
    period: Period,
    requested: [&'static str; VARIABLE_COUNT],
    mapping: fn(&str) -> Option<WeatherVariable>,
    max_age: Option<Duration>,
}

impl WeatherSource {
    /// The forecast endpoint. Cached responses expire.
    pub fn forecast(config: &ForecastConfig) -> Result<Self, FetchError> {
        Ok(Self {
            base_url: parse_base_url(&config.url)?,
            batch_size: checked_batch_size(config.batch_size)?,
            period: Period::NextDays(config.forecast_days),
            requested: FORECAST_REQUEST,
            mapping: forecast_variable,
            max_age: Some(Duration::from_secs(config.cache_expire_secs)),
        })
    }

    /// The archive endpoint for a single day. Cached responses never expire.
    pub fn historical(config: &HistoricalConfig, date: NaiveDate) -> Result<Self, FetchError> {
        Ok(Self {
            base_url: parse_base_url(&config.url)?,
            batch_size: checked_batch_size(config.batch_size)?,
            period: Period::Day(date),
            requested: historical_request(),
            mapping: historical_variable,
            max_age: None,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    pub fn requested(&self) -> &[&'static str] {
        &self.requested
    }

    pub fn mapping(&self) -> fn(&str) -> Option<WeatherVariable> {
        self.mapping
    }

    /// Full request URL for one batch. Doubles as the response cache key.
    pub fn request_url(&self, batch: &[Location]) -> Url {
        let join = |values: Vec<String>| values.join(",");
        let latitudes = join(batch.iter().map(|l| l.latitude.to_string()).collect());
        let longitudes = join(batch.iter().map(|l| l.longitude.to_string()).collect());

        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("latitude", &latitudes)
                .append_pair("longitude", &longitudes)
                .append_pair("hourly", &self.requested.join(","));
            match self.period {
                Period::NextDays(days) => {
                    query.append_pair("forecast_days", &days.to_string());
                }
                Period::Day(date) => {
                    let end = date.checked_add_days(Days::new(1)).unwrap_or(date);
                    query
                        .append_pair("start_date", &date.format("%Y-%m-%d").to_string())
                        .append_pair("end_date", &end.format("%Y-%m-%d").to_string());
                }
            }
            query
                .append_pair("timeformat", "unixtime")
                .append_pair("timezone", "GMT");
        }
        url
    }
}

fn parse_base_url(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|e| {
        FetchError::Config(ConfigError::Invalid(format!("weather URL '{}': {}", raw, e)))
    })
}

fn checked_batch_size(size: usize) -> Result<usize, FetchError> {
    if size == 0 {
        return Err(FetchError::Config(ConfigError::Invalid(
            "batch size must be at least 1".to_string(),
        )));
    }
    Ok(size)
}
