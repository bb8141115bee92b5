//! Shared helpers: a fake Open-Meteo that answers whatever was asked.

#![allow(dead_code)]

use std::collections::HashMap;

use outage_core::{Config, RetrySettings};
use outage_weather::{Location, LocationGrid};
use serde_json::{json, Value};
use url::Url;
use wiremock::{Request, Respond, ResponseTemplate};

/// 2025-04-09T00:00:00Z
pub const START: i64 = 1_744_156_800;
pub const HOURS: usize = 3;

/// Value of the `column`-th requested column at hour `hour`.
pub fn cell(column: usize, hour: usize) -> f64 {
    (column * 100 + hour) as f64
}

/// Build an Open-Meteo style body for the locations and columns in `url`.
///
/// One location yields a bare object, several yield an array.
pub fn body_for(url: &Url) -> Value {
    let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
    let split = |key: &str| -> Vec<f64> {
        query[key]
            .split(',')
            .map(|v| v.parse().unwrap())
            .collect()
    };
    let latitudes = split("latitude");
    let longitudes = split("longitude");
    let columns: Vec<&str> = query["hourly"].split(',').collect();

    let mut blocks: Vec<Value> = latitudes
        .iter()
        .zip(&longitudes)
        .map(|(&lat, &lon)| location_json(lat, lon, &columns))
        .collect();

    if blocks.len() == 1 {
        blocks.remove(0)
    } else {
        Value::Array(blocks)
    }
}

pub fn location_json(latitude: f64, longitude: f64, columns: &[&str]) -> Value {
    let mut hourly = serde_json::Map::new();
    hourly.insert(
        "time".into(),
        json!((0..HOURS).map(|h| START + 3600 * h as i64).collect::<Vec<_>>()),
    );
    for (i, name) in columns.iter().enumerate() {
        hourly.insert(
            name.to_string(),
            json!((0..HOURS).map(|h| cell(i, h)).collect::<Vec<_>>()),
        );
    }
    json!({
        "latitude": latitude,
        "longitude": longitude,
        "generationtime_ms": 0.5,
        "utc_offset_seconds": 0,
        "hourly": hourly,
    })
}

/// Responder that echoes the requested grid back as hourly data.
pub struct OpenMeteoResponder;

impl Respond for OpenMeteoResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(body_for(&request.url))
    }
}

/// Defaults pointed at a mock server, with fast retries.
pub fn test_config(base_uri: &str, cache_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.forecast.url = format!("{}/v1/forecast", base_uri);
    config.historical.url = format!("{}/v1/archive", base_uri);
    config.historical.cache_dir = cache_dir.to_path_buf();
    config.retry = RetrySettings {
        max_retries: 2,
        initial_delay_ms: 1,
        max_delay_ms: 5,
    };
    config
}

/// `n` distinct locations over Colorado.
pub fn colorado_grid(n: usize) -> LocationGrid {
    let locations: Vec<Location> = (0..n)
        .map(|i| Location::new(37.0 + (i / 30) as f64 * 0.25, -109.0 + (i % 30) as f64 * 0.25))
        .collect();
    LocationGrid::from_locations(&locations)
}
