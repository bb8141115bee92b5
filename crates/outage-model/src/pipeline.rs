//! End-to-end scoring: fetch, window, featurize, score, persist.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use outage_core::Config;
use outage_weather::{
    parse_utc_instant, FetchRange, LocationGrid, ObservationTable, OpenMeteoClient, Transport,
    WeatherFetcher,
};

use crate::aggregator::PredictionAggregator;
use crate::error::{PipelineError, PredictError};
use crate::features::FeatureBuilder;
use crate::output::{read_predictions, write_predictions, Prediction};
use crate::predictor::Predictor;
use crate::window::TimeWindowSelector;

/// Everything needed to turn the location grid into outage probabilities.
///
/// Overlapping `refresh` calls are not serialized here; callers that trigger
/// them from several places must do that themselves.
pub struct Pipeline<T: Transport = OpenMeteoClient> {
    fetcher: WeatherFetcher<T>,
    grid: LocationGrid,
    selector: TimeWindowSelector,
    aggregator: PredictionAggregator,
    predictions_path: PathBuf,
}

impl Pipeline<OpenMeteoClient> {
    /// Load the grid and model named in `config` and wire up the production
    /// fetcher.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let grid = LocationGrid::load_csv(&config.grid.path)?;
        let predictor = Predictor::from_model_file(&config.model.path)?;
        let fetcher = WeatherFetcher::from_config(config)?;
        Ok(Self::new(config, fetcher, grid, predictor))
    }
}

impl<T: Transport> Pipeline<T> {
    pub fn new(
        config: &Config,
        fetcher: WeatherFetcher<T>,
        grid: LocationGrid,
        predictor: Predictor,
    ) -> Self {
        Self {
            fetcher,
            grid,
            selector: TimeWindowSelector::from_hours(config.model.window_hours),
            aggregator: PredictionAggregator::new(
                FeatureBuilder::new(config.model.num_steps),
                predictor,
            ),
            predictions_path: config.output.predictions_path.clone(),
        }
    }

    pub fn grid(&self) -> &LocationGrid {
        &self.grid
    }

    pub fn fetcher(&self) -> &WeatherFetcher<T> {
        &self.fetcher
    }

    /// Score the upcoming window using the forecast and the wall clock.
    pub async fn predict_current(&self) -> Result<Vec<Prediction>, PipelineError> {
        let table = self.fetcher.fetch(&self.grid, FetchRange::Forecast).await?;
        Ok(self.score_table(&table, Utc::now())?)
    }

    /// Score the window starting at `instant` using archived weather for
    /// that day.
    ///
    /// A malformed instant is rejected before anything is fetched.
    pub async fn predict_at(&self, instant: &str) -> Result<Vec<Prediction>, PipelineError> {
        let now = parse_utc_instant(instant)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
        tracing::info!("Scoring historical window starting {}", now);

        let table = self
            .fetcher
            .fetch(&self.grid, FetchRange::Historical(now.date_naive()))
            .await?;
        Ok(self.score_table(&table, now)?)
    }

    /// Recompute current predictions and replace the artifact.
    pub async fn refresh(&self) -> Result<Vec<Prediction>, PipelineError> {
        tracing::info!("Updating predictions...");
        let predictions = self.predict_current().await?;
        write_predictions(&self.predictions_path, &predictions)?;
        Ok(predictions)
    }

    /// The predictions written by the last `refresh`.
    pub fn load_latest(&self) -> Result<Vec<Prediction>, PipelineError> {
        Ok(read_predictions(&self.predictions_path)?)
    }

    /// Window, featurize and score an already fetched table.
    pub fn score_table(
        &self,
        table: &ObservationTable,
        now: DateTime<Utc>,
    ) -> Result<Vec<Prediction>, PredictError> {
        let groups = self.selector.select(table, now);
        tracing::debug!(
            "{} of {} grid locations have rows in the window",
            groups.len(),
            self.grid.latitudes().len()
        );
        self.aggregator.aggregate(&groups)
    }
}
