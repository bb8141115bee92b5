//! Scoring every selected location into one prediction table.

use std::collections::BTreeMap;

use outage_weather::{Location, ObservationSeries};

use crate::error::{FeatureError, PredictError};
use crate::features::FeatureBuilder;
use crate::output::Prediction;
use crate::predictor::Predictor;

#[derive(Debug, Clone)]
pub struct PredictionAggregator {
    builder: FeatureBuilder,
    predictor: Predictor,
}

impl PredictionAggregator {
    pub fn new(builder: FeatureBuilder, predictor: Predictor) -> Self {
        Self { builder, predictor }
    }

    /// One prediction per location with a full window, in map order.
    ///
    /// Locations with too few hourly rows are skipped; a classifier failure
    /// aborts the whole run.
    pub fn aggregate(
        &self,
        groups: &BTreeMap<Location, ObservationSeries>,
    ) -> Result<Vec<Prediction>, PredictError> {
        let mut predictions = Vec::with_capacity(groups.len());
        let mut skipped = 0usize;

        for (location, series) in groups {
            let vector = match self.builder.build(series) {
                Ok(vector) => vector,
                Err(FeatureError::InsufficientData {
                    required,
                    available,
                }) => {
                    tracing::warn!(
                        "Skipping {}: {} of {} hourly rows in window",
                        location,
                        available,
                        required
                    );
                    skipped += 1;
                    continue;
                }
            };

            predictions.push(Prediction {
                latitude: location.latitude,
                longitude: location.longitude,
                probability: self.predictor.score(&vector)?,
            });
        }

        tracing::info!(
            "Scored {} locations ({} skipped for missing data)",
            predictions.len(),
            skipped
        );
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::features::FeatureVector;
    use crate::predictor::Classifier;
    use chrono::{Duration, TimeZone, Utc};
    use outage_weather::WeatherObservation;
    use std::sync::Arc;

    /// Returns the mean of the inputs scaled into [0, 1].
    struct MeanClassifier;

    impl Classifier for MeanClassifier {
        fn predict_proba(&self, features: &FeatureVector) -> Result<f64, PredictError> {
            let sum: f64 = features.values().iter().sum();
            Ok(sum / features.len() as f64 / 100.0)
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn predict_proba(&self, _: &FeatureVector) -> Result<f64, PredictError> {
            Ok(2.0)
        }
    }

    fn series(location: Location, hours: i64, value: f64) -> ObservationSeries {
        let base = Utc.with_ymd_and_hms(2025, 4, 9, 0, 0, 0).unwrap();
        ObservationSeries::from_unsorted(
            (0..hours)
                .map(|h| WeatherObservation {
                    location,
                    timestamp: base + Duration::hours(h),
                    values: [value; 12],
                })
                .collect(),
        )
    }

    fn aggregator(classifier: impl Classifier + 'static) -> PredictionAggregator {
        PredictionAggregator::new(
            FeatureBuilder::default(),
            Predictor::new(Arc::new(classifier)),
        )
    }

    #[test]
    fn test_short_location_is_excluded() {
        let a = Location::new(39.0, -105.0);
        let b = Location::new(40.0, -105.0);
        let mut groups = BTreeMap::new();
        groups.insert(a, series(a, 12, 25.0));
        groups.insert(b, series(b, 5, 50.0));

        let predictions = aggregator(MeanClassifier).aggregate(&groups).unwrap();

        assert_eq!(
            predictions,
            vec![Prediction {
                latitude: 39.0,
                longitude: -105.0,
                probability: 0.25
            }]
        );
    }

    #[test]
    fn test_output_follows_map_order() {
        let locations = [
            Location::new(40.5, -104.0),
            Location::new(37.0, -108.0),
            Location::new(39.0, -106.0),
        ];
        let groups: BTreeMap<_, _> = locations
            .iter()
            .map(|&l| (l, series(l, 14, l.latitude)))
            .collect();

        let predictions = aggregator(MeanClassifier).aggregate(&groups).unwrap();

        let lats: Vec<f64> = predictions.iter().map(|p| p.latitude).collect();
        assert_eq!(lats, vec![37.0, 39.0, 40.5]);
        assert!(predictions.iter().all(|p| (0.0..=1.0).contains(&p.probability)));
    }

    #[test]
    fn test_classifier_failure_aborts() {
        let a = Location::new(39.0, -105.0);
        let groups = BTreeMap::from([(a, series(a, 12, 1.0))]);

        assert!(matches!(
            aggregator(Broken).aggregate(&groups),
            Err(PredictError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        let predictions = aggregator(MeanClassifier).aggregate(&BTreeMap::new()).unwrap();
        assert!(predictions.is_empty());
    }
}
