//! Batched, rate-limited, cached retrieval of hourly observations.

use chrono::NaiveDate;
use outage_core::Config;
use url::Url;

use crate::client::{OpenMeteoClient, Transport};
use crate::day_cache::DayCache;
use crate::error::FetchError;
use crate::grid::LocationGrid;
use crate::http_cache::HttpCache;
use crate::rate_limit::RateLimiter;
use crate::response::parse_blocks;
use crate::retry::RetryConfig;
use crate::source::WeatherSource;
use crate::types::{FetchRange, Location, ObservationTable, WeatherObservation};

/// Fetches weather for a location grid.
///
/// Every batch goes through the response cache first; only cache misses hit
/// the transport and count toward the rate limit.
pub struct WeatherFetcher<T: Transport = OpenMeteoClient> {
    config: Config,
    transport: T,
    cache: HttpCache,
}

impl WeatherFetcher<OpenMeteoClient> {
    /// Build the production fetcher: Open-Meteo over HTTP with an on-disk
    /// response cache.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let transport = OpenMeteoClient::new(RetryConfig::from(&config.retry))?;
        let cache = HttpCache::new(&config.http_cache.path)?;
        Ok(Self::new(config.clone(), transport, cache))
    }
}

impl<T: Transport> WeatherFetcher<T> {
    pub fn new(config: Config, transport: T, cache: HttpCache) -> Self {
        Self {
            config,
            transport,
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> &HttpCache {
        &self.cache
    }

    pub fn day_cache(&self) -> DayCache {
        DayCache::new(&self.config.historical.cache_dir)
    }

    /// Fetch all grid locations for `range` into one table, in batch order.
    ///
    /// A mismatched grid fails before any cache or network activity. Any
    /// batch failure aborts the whole fetch.
    pub async fn fetch(
        &self,
        grid: &LocationGrid,
        range: FetchRange,
    ) -> Result<ObservationTable, FetchError> {
        let locations = grid.locations()?;

        match range {
            FetchRange::Forecast => {
                let source = WeatherSource::forecast(&self.config.forecast)?;
                self.fetch_batches(&locations, &source).await
            }
            FetchRange::Historical(date) => self.fetch_historical(&locations, date).await,
        }
    }

    async fn fetch_historical(
        &self,
        locations: &[Location],
        date: NaiveDate,
    ) -> Result<ObservationTable, FetchError> {
        let day_cache = self.day_cache();
        if let Some(table) = day_cache.load(date)? {
            return Ok(table);
        }

        let source = WeatherSource::historical(&self.config.historical, date)?;
        let table = self.fetch_batches(locations, &source).await?;

        if table.is_empty() {
            tracing::warn!("No data fetched for {}", date);
        } else {
            day_cache.store(date, &table)?;
        }
        Ok(table)
    }

    async fn fetch_batches(
        &self,
        locations: &[Location],
        source: &WeatherSource,
    ) -> Result<ObservationTable, FetchError> {
        let mut limiter = RateLimiter::from_config(&self.config.rate_limit);
        let mut table = ObservationTable::new();
        let total = locations.len().div_ceil(source.batch_size());

        for (i, batch) in locations.chunks(source.batch_size()).enumerate() {
            let rows = self.fetch_batch(batch, source, &mut limiter).await?;
            tracing::info!(
                "Fetched batch {}/{}: {} locations, {} rows",
                i + 1,
                total,
                batch.len(),
                rows.len()
            );
            table.extend(rows);
        }

        Ok(table)
    }

    async fn fetch_batch(
        &self,
        batch: &[Location],
        source: &WeatherSource,
        limiter: &mut RateLimiter,
    ) -> Result<Vec<WeatherObservation>, FetchError> {
        let url = source.request_url(batch);
        let key = url.as_str();

        if let Some(body) = self.cache.get(key, source.max_age())? {
            match decode_batch(&body, batch.len(), source) {
                Ok(rows) => {
                    tracing::debug!("Response cache hit for {} locations", batch.len());
                    return Ok(rows);
                }
                Err(e) => {
                    tracing::warn!("Discarding unusable cached response: {}", e);
                    self.cache.remove(key)?;
                }
            }
        }

        let body = self.send(&url, batch.len(), limiter).await?;
        let rows = decode_batch(&body, batch.len(), source)?;
        self.cache.put(key, &body)?;
        Ok(rows)
    }

    async fn send(
        &self,
        url: &Url,
        points: usize,
        limiter: &mut RateLimiter,
    ) -> Result<String, FetchError> {
        limiter.acquire().await;
        let result = self.transport.get(url).await;
        limiter.record(points);
        result
    }
}

/// Parse a body and check that it holds one well-formed block per
/// requested location.
fn decode_batch(
    body: &str,
    expected: usize,
    source: &WeatherSource,
) -> Result<Vec<WeatherObservation>, FetchError> {
    let blocks = parse_blocks(body)?;
    if blocks.len() != expected {
        return Err(FetchError::Shape(format!(
            "expected {} locations in response, got {}",
            expected,
            blocks.len()
        )));
    }

    let mut rows = Vec::new();
    for block in blocks {
        rows.extend(block.into_observations(source.requested(), source.mapping())?);
    }
    Ok(rows)
}
