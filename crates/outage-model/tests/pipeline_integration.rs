//! Integration tests for Pipeline against a mock Open-Meteo server.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, DurationRound, TimeZone, Utc};
use outage_core::{Config, RetrySettings};
use outage_model::{
    Classifier, FeatureVector, Pipeline, PipelineError, Prediction, PredictError, Predictor,
};
use outage_weather::{
    DayCache, HttpCache, Location, LocationGrid, ObservationTable, OpenMeteoClient, RetryConfig,
    WeatherFetcher, WeatherObservation,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Probability = first temperature in the window / 100.
struct FirstTemperature;

impl Classifier for FirstTemperature {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        Ok(features.get("temperature_2m-1").unwrap_or(0.0) / 100.0)
    }
}

/// Forecast responder: 48 hourly samples from the start of the current
/// hour, temperature = 10 + latitude.
struct CurrentForecast;

impl Respond for CurrentForecast {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
        let start = Utc::now()
            .duration_trunc(Duration::hours(1))
            .unwrap()
            .timestamp();
        let columns: Vec<&str> = query["hourly"].split(',').collect();

        let blocks: Vec<Value> = query["latitude"]
            .split(',')
            .zip(query["longitude"].split(','))
            .map(|(lat, lon)| {
                let lat: f64 = lat.parse().unwrap();
                let lon: f64 = lon.parse().unwrap();
                let mut hourly = serde_json::Map::new();
                hourly.insert(
                    "time".into(),
                    json!((0..48).map(|h| start + 3600 * h).collect::<Vec<_>>()),
                );
                for column in &columns {
                    let value = if *column == "temperature_2m" { 10.0 + lat } else { 1.0 };
                    hourly.insert(column.to_string(), json!(vec![value; 48]));
                }
                json!({"latitude": lat, "longitude": lon, "hourly": hourly})
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(Value::Array(blocks))
    }
}

fn test_config(base_uri: &str, dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.forecast.url = format!("{}/v1/forecast", base_uri);
    config.historical.url = format!("{}/v1/archive", base_uri);
    config.historical.cache_dir = dir.join("forecasting");
    config.http_cache.path = dir.join("cache_http.sqlite");
    config.output.predictions_path = dir.join("data").join("outage_predictions.csv");
    config.retry = RetrySettings {
        max_retries: 1,
        initial_delay_ms: 1,
        max_delay_ms: 2,
    };
    config
}

fn pipeline(config: &Config, grid: LocationGrid) -> Pipeline {
    let client = OpenMeteoClient::new(RetryConfig::from(&config.retry)).unwrap();
    let fetcher = WeatherFetcher::new(config.clone(), client, HttpCache::in_memory().unwrap());
    Pipeline::new(
        config,
        fetcher,
        grid,
        Predictor::new(Arc::new(FirstTemperature)),
    )
}

fn at(day_hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 9, 0, 0, 0).unwrap() + Duration::hours(day_hour)
}

fn rows(location: Location, hours: std::ops::Range<i64>) -> Vec<WeatherObservation> {
    hours
        .map(|h| WeatherObservation {
            location,
            timestamp: at(h),
            values: [h as f64; 12],
        })
        .collect()
}

#[tokio::test]
async fn test_predict_at_scores_only_locations_with_data() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), dir.path());
    let covered = Location::new(39.75, -105.0);
    let empty = Location::new(40.0, -104.75);

    // covered: 14 rows inside [06:00, 18:00); empty: only rows before 06:00
    let mut day = rows(covered, 6..20);
    day.extend(rows(empty, 0..6));
    DayCache::new(&config.historical.cache_dir)
        .store(at(0).date_naive(), &ObservationTable::from_rows(day))
        .unwrap();

    let grid = LocationGrid::from_locations(&[covered, empty]);
    let predictions = pipeline(&config, grid)
        .predict_at("2025-04-09T06:00:00")
        .await
        .unwrap();

    // window holds hours 6..18, so the first step is hour 6
    assert_eq!(
        predictions,
        vec![Prediction {
            latitude: 39.75,
            longitude: -105.0,
            probability: 0.06
        }]
    );
}

#[tokio::test]
async fn test_predict_at_rejects_malformed_instant() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), dir.path());
    let grid = LocationGrid::from_locations(&[Location::new(39.0, -105.0)]);
    let err = pipeline(&config, grid)
        .predict_at("next tuesday")
        .await
        .unwrap_err();

    assert!(err.is_client_error());
    assert!(matches!(err, PipelineError::InvalidInput(msg) if msg.contains("next tuesday")));
}

#[tokio::test]
async fn test_refresh_writes_artifact_and_load_latest_reads_it() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(CurrentForecast)
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), dir.path());
    let grid = LocationGrid::new(vec![40.0, 37.5, 39.0], vec![-105.0, -106.0, -104.0]);
    let pipeline = pipeline(&config, grid);

    assert!(matches!(
        pipeline.load_latest(),
        Err(PipelineError::Output(_))
    ));

    let predictions = pipeline.refresh().await.unwrap();

    let lats: Vec<f64> = predictions.iter().map(|p| p.latitude).collect();
    assert_eq!(lats, vec![37.5, 39.0, 40.0]);
    for p in &predictions {
        assert!((p.probability - (10.0 + p.latitude) / 100.0).abs() < 1e-12);
    }
    assert!(config.output.predictions_path.is_file());
    assert_eq!(pipeline.load_latest().unwrap(), predictions);
}

#[tokio::test]
async fn test_fetch_failure_surfaces_as_fetch_error() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), dir.path());
    let grid = LocationGrid::from_locations(&[Location::new(39.0, -105.0)]);
    let err = pipeline(&config, grid).predict_current().await.unwrap_err();

    assert!(matches!(err, PipelineError::Fetch(_)));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn test_from_config_loads_grid_and_model() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(CurrentForecast)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri(), dir.path());
    config.grid.path = dir.path().join("grid.csv");
    config.model.path = dir.path().join("xgboost_best_model.json");
    std::fs::write(&config.grid.path, "latitude,longitude\n39.0,-105.0\n38.5,-104.5\n").unwrap();

    // a single leaf of 0.0 over base score 0.5
    let model = json!({
        "learner": {
            "gradient_booster": {
                "name": "gbtree",
                "model": {"trees": [{
                    "left_children": [-1],
                    "right_children": [-1],
                    "split_indices": [0],
                    "split_conditions": [0.0],
                    "default_left": [0]
                }]}
            },
            "learner_model_param": {"base_score": "5E-1", "num_class": "0", "num_feature": "144"},
            "objective": {"name": "binary:logistic"}
        }
    });
    std::fs::write(&config.model.path, model.to_string()).unwrap();

    let pipeline = Pipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.grid().latitudes(), &[39.0, 38.5]);

    let predictions = pipeline.predict_current().await.unwrap();
    assert_eq!(predictions.len(), 2);
    assert!(predictions.iter().all(|p| (p.probability - 0.5).abs() < 1e-12));
}

#[test]
fn test_from_config_missing_grid_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config("http://localhost:9", dir.path());
    config.grid.path = dir.path().join("absent.csv");

    assert!(matches!(
        Pipeline::from_config(&config),
        Err(PipelineError::Config(_))
    ));
}
