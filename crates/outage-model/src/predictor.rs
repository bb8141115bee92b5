//! Scoring feature vectors with an injected classifier.

use std::path::Path;
use std::sync::Arc;

use crate::booster::Booster;
use crate::error::PredictError;
use crate::features::FeatureVector;

/// A trained binary classifier. Implementations are immutable after
/// construction and shared across callers.
pub trait Classifier: Send + Sync {
    /// Probability of the positive class for one input row.
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64, PredictError>;
}

/// Wraps a shared classifier and checks what it returns.
#[derive(Clone)]
pub struct Predictor {
    classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor").finish_non_exhaustive()
    }
}

impl Predictor {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Load the tree ensemble at `path`.
    pub fn from_model_file(path: &Path) -> Result<Self, PredictError> {
        Ok(Self::new(Arc::new(Booster::from_file(path)?)))
    }

    /// Outage probability for one location, always within `[0, 1]`.
    pub fn score(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        let p = self.classifier.predict_proba(features)?;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(PredictError::InvalidOutput(p));
        }
        Ok(p)
    }
}
