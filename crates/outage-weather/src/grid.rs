//! The fixed set of grid points to score.
//!
//! The grid is external input held as parallel coordinate lists. Their
//! lengths are checked when a fetch starts, not on construction, so a
//! mismatched grid fails before any request is made.

use std::path::Path;

use outage_core::ConfigError;
use serde::Deserialize;

use crate::types::Location;

#[derive(Debug, Clone, Default)]
pub struct LocationGrid {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct GridRow {
    latitude: f64,
    longitude: f64,
}

impl LocationGrid {
    pub fn new(latitudes: Vec<f64>, longitudes: Vec<f64>) -> Self {
        Self {
            latitudes,
            longitudes,
        }
    }

    pub fn from_locations(locations: &[Location]) -> Self {
        Self {
            latitudes: locations.iter().map(|l| l.latitude).collect(),
            longitudes: locations.iter().map(|l| l.longitude).collect(),
        }
    }

    /// Load a grid from a CSV file with `latitude,longitude` columns.
    pub fn load_csv(path: &Path) -> Result<Self, ConfigError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| ConfigError::GridNotFound(format!("{}: {}", path.display(), e)))?;

        let mut grid = Self::default();
        for (line, result) in reader.deserialize::<GridRow>().enumerate() {
            let row = result.map_err(|e| {
                ConfigError::ParseError(format!("{} row {}: {}", path.display(), line + 1, e))
            })?;
            grid.latitudes.push(row.latitude);
            grid.longitudes.push(row.longitude);
        }

        tracing::info!("Loaded {} grid points from {}", grid.latitudes.len(), path.display());
        Ok(grid)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.latitudes.len() != self.longitudes.len() {
            return Err(ConfigError::GridMismatch {
                latitudes: self.latitudes.len(),
                longitudes: self.longitudes.len(),
            });
        }
        Ok(())
    }

    /// Paired locations in grid order. Fails on mismatched lists.
    pub fn locations(&self) -> Result<Vec<Location>, ConfigError> {
        self.validate()?;
        Ok(self
            .latitudes
            .iter()
            .zip(&self.longitudes)
            .map(|(&lat, &lon)| Location::new(lat, lon))
            .collect())
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }
}
