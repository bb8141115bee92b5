//! One CSV file per historical day.
//!
//! Columns: `date,latitude,longitude` followed by the twelve variables in
//! canonical order. If the file for a date exists, it is the answer for that
//! date and no request is made. Files are written under a temporary name
//! and renamed into place, so a failed write never leaves a partial file.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, SecondsFormat};

use crate::error::FetchError;
use crate::time::parse_utc_instant;
use crate::types::{Location, ObservationTable, WeatherObservation};
use crate::variables::{WeatherVariable, VARIABLE_COUNT};

#[derive(Debug, Clone)]
pub struct DayCache {
    dir: PathBuf,
}

impl DayCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("historical_{}.csv", date.format("%Y-%m-%d")))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.path_for(date).is_file()
    }

    /// Load the table for `date`, or `None` if no file exists.
    pub fn load(&self, date: NaiveDate) -> Result<Option<ObservationTable>, FetchError> {
        let path = self.path_for(date);
        if !path.is_file() {
            return Ok(None);
        }
        read_table(&path).map(Some)
    }

    /// Write the table for `date`, replacing any existing file.
    pub fn store(&self, date: NaiveDate, table: &ObservationTable) -> Result<PathBuf, FetchError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(date);
        let partial = path.with_extension("csv.partial");

        let written = File::create(&partial)
            .map_err(|e| day_cache_error(&partial, e))
            .and_then(|file| write_table(file, &partial, table))
            .and_then(|()| std::fs::rename(&partial, &path).map_err(|e| day_cache_error(&path, e)));
        if let Err(e) = written {
            if let Err(remove) = std::fs::remove_file(&partial) {
                tracing::debug!("Could not remove {}: {}", partial.display(), remove);
            }
            return Err(e);
        }

        tracing::info!("Cached {} historical rows to {}", table.len(), path.display());
        Ok(path)
    }
}

fn day_cache_error(path: &Path, message: impl std::fmt::Display) -> FetchError {
    FetchError::DayCache {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

fn write_table<W: Write>(out: W, path: &Path, table: &ObservationTable) -> Result<(), FetchError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["date", "latitude", "longitude"];
    header.extend(WeatherVariable::ALL.map(WeatherVariable::name));
    writer.write_record(&header).map_err(|e| day_cache_error(path, e))?;

    for row in table.rows() {
        let mut record = Vec::with_capacity(3 + VARIABLE_COUNT);
        record.push(row.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true));
        record.push(row.location.latitude.to_string());
        record.push(row.location.longitude.to_string());
        // missing values are written as empty fields
        record.extend(row.values.iter().map(|v| {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        writer.write_record(&record).map_err(|e| day_cache_error(path, e))?;
    }

    writer.flush().map_err(|e| day_cache_error(path, e))?;
    Ok(())
}

fn read_table(path: &Path) -> Result<ObservationTable, FetchError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| day_cache_error(path, e))?;

    let headers = reader.headers().map_err(|e| day_cache_error(path, e))?.clone();
    let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    let column = |name: &str| {
        index
            .get(name)
            .copied()
            .ok_or_else(|| day_cache_error(path, format!("missing column '{}'", name)))
    };

    let date_col = column("date")?;
    let lat_col = column("latitude")?;
    let lon_col = column("longitude")?;
    let mut var_cols = [0usize; VARIABLE_COUNT];
    for variable in WeatherVariable::ALL {
        var_cols[variable.index()] = column(variable.name())?;
    }

    let mut table = ObservationTable::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| day_cache_error(path, e))?;
        let field = |col: usize| record.get(col).unwrap_or_default().trim();
        let at_row = |message: String| day_cache_error(path, format!("row {}: {}", line + 1, message));

        let timestamp = parse_utc_instant(field(date_col)).map_err(|e| at_row(e.to_string()))?;
        let latitude = parse_float(field(lat_col)).map_err(&at_row)?;
        let longitude = parse_float(field(lon_col)).map_err(&at_row)?;

        let mut values = [f64::NAN; VARIABLE_COUNT];
        for (slot, &col) in values.iter_mut().zip(&var_cols) {
            let raw = field(col);
            if !raw.is_empty() {
                *slot = parse_float(raw).map_err(&at_row)?;
            }
        }

        table.push(WeatherObservation {
            location: Location::new(latitude, longitude),
            timestamp,
            values,
        });
    }

    tracing::info!("Loaded {} cached historical rows from {}", table.len(), path.display());
    Ok(table)
}

fn parse_float(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|e| format!("invalid number {:?}: {}", raw, e))
}
