//! Flattening an hourly series into the classifier's input layout.
//!
//! Field `"{variable}-{i}"` holds `variable` at the i-th earliest of the
//! last `num_steps` hours; variables follow the canonical order within each
//! step. The trained model depends on this exact order.

use std::sync::Arc;

use outage_weather::{ObservationSeries, WeatherVariable, VARIABLE_COUNT};

use crate::error::FeatureError;

pub const DEFAULT_NUM_STEPS: usize = 12;

/// Field names for `num_steps` hourly steps, in input order.
pub fn feature_names(num_steps: usize) -> Vec<String> {
    (1..=num_steps)
        .flat_map(|step| {
            WeatherVariable::ALL
                .iter()
                .map(move |variable| format!("{}-{}", variable.name(), step))
        })
        .collect()
}

/// One model input row: named values in the trained order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }
}

#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    num_steps: usize,
    names: Arc<[String]>,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_STEPS)
    }
}

impl FeatureBuilder {
    pub fn new(num_steps: usize) -> Self {
        Self {
            num_steps,
            names: feature_names(num_steps).into(),
        }
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Build the vector from the most recent `num_steps` rows of `series`.
    pub fn build(&self, series: &ObservationSeries) -> Result<FeatureVector, FeatureError> {
        let rows = series
            .last_n(self.num_steps)
            .ok_or(FeatureError::InsufficientData {
                required: self.num_steps,
                available: series.len(),
            })?;

        let mut values = Vec::with_capacity(self.num_steps * VARIABLE_COUNT);
        for row in rows {
            values.extend(WeatherVariable::ALL.iter().map(|&v| row.value(v)));
        }

        Ok(FeatureVector {
            names: Arc::clone(&self.names),
            values,
        })
    }
}
