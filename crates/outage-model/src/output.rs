//! The predictions artifact: `latitude,longitude,probability` rows.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OutputError;

/// Outage probability for one grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub latitude: f64,
    pub longitude: f64,
    pub probability: f64,
}

fn csv_error(path: &Path, e: csv::Error) -> OutputError {
    OutputError::Csv {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Write predictions, replacing any existing file.
pub fn write_predictions(path: &Path, predictions: &[Prediction]) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    if predictions.is_empty() {
        writer
            .write_record(["latitude", "longitude", "probability"])
            .map_err(|e| csv_error(path, e))?;
    }
    for prediction in predictions {
        writer.serialize(prediction).map_err(|e| csv_error(path, e))?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} predictions to {}", predictions.len(), path.display());
    Ok(())
}

pub fn read_predictions(path: &Path) -> Result<Vec<Prediction>, OutputError> {
    if !path.is_file() {
        return Err(OutputError::NotFound(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<Prediction>, _>>()
        .map_err(|e| csv_error(path, e))
}
