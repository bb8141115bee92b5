//! Outage probability scoring for the location grid.
//!
//! Observations are trimmed to a forward-looking window per location,
//! flattened into the classifier's input layout and scored by a gradient
//! boosted tree ensemble.

pub mod aggregator;
pub mod booster;
pub mod error;
pub mod features;
pub mod output;
pub mod pipeline;
pub mod predictor;
pub mod window;

pub use aggregator::PredictionAggregator;
pub use booster::Booster;
pub use error::{FeatureError, OutputError, PipelineError, PredictError};
pub use features::{feature_names, FeatureBuilder, FeatureVector, DEFAULT_NUM_STEPS};
pub use output::{read_predictions, write_predictions, Prediction};
pub use pipeline::Pipeline;
pub use predictor::{Classifier, Predictor};
pub use window::{TimeWindowSelector, DEFAULT_WINDOW_HOURS};
