//! Open-Meteo JSON responses and their conversion into observations.
//!
//! Each location's hourly block is described by a start instant, an end
//! instant and a sampling interval; timestamps are rebuilt from those three
//! values and every variable column must have exactly that many entries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::FetchError;
use crate::types::{Location, WeatherObservation};
use crate::variables::{WeatherVariable, VARIABLE_COUNT};

const DEFAULT_INTERVAL_SECS: i64 = 3600;

/// A multi-location request returns an array; a single location returns
/// a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Many(Vec<LocationPayload>),
    One(LocationPayload),
}

#[derive(Debug, Deserialize)]
struct LocationPayload {
    latitude: f64,
    longitude: f64,
    hourly: HourlyPayload,
}

#[derive(Debug, Deserialize)]
struct HourlyPayload {
    time: Vec<i64>,
    #[serde(flatten)]
    columns: HashMap<String, Vec<Option<f64>>>,
}

/// Error body returned with 4xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub reason: String,
}

/// Hourly data for one location.
#[derive(Debug, Clone)]
pub struct HourlyBlock {
    pub location: Location,
    /// Unix seconds of the first sample
    pub start: i64,
    /// Unix seconds one interval past the last sample
    pub end: i64,
    /// Seconds between samples
    pub interval: i64,
    /// Upstream column name to values (NaN for missing)
    pub columns: HashMap<String, Vec<f64>>,
}

impl HourlyBlock {
    fn from_payload(payload: LocationPayload) -> Result<Self, FetchError> {
        let time = payload.hourly.time;
        let start = time.first().copied().unwrap_or(0);
        let interval = match time.as_slice() {
            [a, b, ..] => b - a,
            _ => DEFAULT_INTERVAL_SECS,
        };
        if interval <= 0 {
            return Err(FetchError::Shape(format!(
                "non-increasing time axis (interval {}s)",
                interval
            )));
        }
        if let Some(pos) = time.windows(2).position(|w| w[1] - w[0] != interval) {
            return Err(FetchError::Shape(format!(
                "uneven time axis at sample {} (expected {}s steps)",
                pos + 1,
                interval
            )));
        }

        let end = start + interval * time.len() as i64;
        let columns = payload
            .hourly
            .columns
            .into_iter()
            .map(|(name, values)| {
                let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                (name, values)
            })
            .collect();

        Ok(Self {
            location: Location::new(payload.latitude, payload.longitude),
            start,
            end,
            interval,
            columns,
        })
    }

    /// Number of samples implied by start, end and interval.
    pub fn len(&self) -> usize {
        ((self.end - self.start) / self.interval).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `start + k * interval` for every sample, as UTC instants.
    pub fn timestamps(&self) -> Result<Vec<DateTime<Utc>>, FetchError> {
        (0..self.len() as i64)
            .map(|k| {
                let secs = self.start + k * self.interval;
                DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| FetchError::Shape(format!("timestamp out of range: {}", secs)))
            })
            .collect()
    }

    /// Turn the block into one observation per hour.
    ///
    /// `requested` lists the upstream column names that were asked for and
    /// `mapping` says which variable each column holds.
    pub fn into_observations(
        self,
        requested: &[&str],
        mapping: fn(&str) -> Option<WeatherVariable>,
    ) -> Result<Vec<WeatherObservation>, FetchError> {
        let timestamps = self.timestamps()?;
        let n = timestamps.len();

        let mut slots: [Option<&Vec<f64>>; VARIABLE_COUNT] = [None; VARIABLE_COUNT];
        for column in requested {
            let variable = mapping(column).ok_or_else(|| {
                FetchError::Shape(format!("no variable mapping for column '{}'", column))
            })?;
            let values = self.columns.get(*column).ok_or_else(|| {
                FetchError::Shape(format!("response is missing column '{}'", column))
            })?;
            if values.len() != n {
                return Err(FetchError::Shape(format!(
                    "column '{}' has {} values for {} timestamps",
                    column,
                    values.len(),
                    n
                )));
            }
            slots[variable.index()] = Some(values);
        }

        let columns = WeatherVariable::ALL
            .iter()
            .map(|variable| {
                slots[variable.index()].map(Vec::as_slice).ok_or_else(|| {
                    FetchError::Shape(format!("no column provides '{}'", variable.name()))
                })
            })
            .collect::<Result<Vec<&[f64]>, _>>()?;

        Ok(timestamps
            .into_iter()
            .enumerate()
            .map(|(row, timestamp)| WeatherObservation {
                location: self.location,
                timestamp,
                values: std::array::from_fn(|i| columns[i][row]),
            })
            .collect())
    }
}

/// Parse a response body into one block per location, in response order.
pub fn parse_blocks(body: &str) -> Result<Vec<HourlyBlock>, FetchError> {
    let payload: Payload = serde_json::from_str(body)
        .map_err(|e| FetchError::Shape(format!("invalid JSON body: {}", e)))?;

    let payloads = match payload {
        Payload::Many(items) => items,
        Payload::One(item) => vec![item],
    };

    payloads.into_iter().map(HourlyBlock::from_payload).collect()
}

/// Pull the `reason` out of an error body, falling back to the raw text.
pub(crate) fn error_reason(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.reason)
        .unwrap_or_else(|_| body.to_string())
}
