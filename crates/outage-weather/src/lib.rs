//! Hourly weather retrieval for a fixed location grid.
//!
//! Locations are fetched in fixed-size batches through a response cache, a
//! points-based rate limiter and a retrying HTTP transport. Historical days
//! are additionally kept as one CSV file per day.

pub mod client;
pub mod day_cache;
pub mod error;
pub mod fetcher;
pub mod grid;
pub mod http_cache;
pub mod rate_limit;
pub mod response;
pub mod retry;
pub mod source;
pub mod time;
pub mod types;
pub mod variables;

pub use client::{OpenMeteoClient, Transport};
pub use day_cache::DayCache;
pub use error::FetchError;
pub use fetcher::WeatherFetcher;
pub use grid::LocationGrid;
pub use http_cache::HttpCache;
pub use rate_limit::RateLimiter;
pub use response::{parse_blocks, HourlyBlock};
pub use retry::RetryConfig;
pub use source::WeatherSource;
pub use time::{parse_utc_instant, InstantParseError};
pub use types::{FetchRange, Location, ObservationSeries, ObservationTable, WeatherObservation};
pub use variables::{WeatherVariable, VARIABLE_COUNT};
