use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::variables::{WeatherVariable, VARIABLE_COUNT};

/// A grid point. Equality and ordering compare the exact float values, so a
/// location can key an ordered map.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Location {}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        self.latitude
            .total_cmp(&other.latitude)
            .then_with(|| self.longitude.total_cmp(&other.longitude))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Which time range to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRange {
    /// The next `forecast_days` days from the forecast source.
    Forecast,
    /// One calendar day (UTC) from the archive source.
    Historical(NaiveDate),
}

/// One hour of weather at one location. Missing upstream values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    pub location: Location,
    pub timestamp: DateTime<Utc>,
    pub values: [f64; VARIABLE_COUNT],
}

impl WeatherObservation {
    pub fn value(&self, variable: WeatherVariable) -> f64 {
        self.values[variable.index()]
    }
}

/// All observations returned by one fetch, locations concatenated in
/// request order. Not deduplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    rows: Vec<WeatherObservation>,
}

impl ObservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<WeatherObservation>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: WeatherObservation) {
        self.rows.push(row);
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = WeatherObservation>) {
        self.rows.extend(rows);
    }

    pub fn rows(&self) -> &[WeatherObservation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<WeatherObservation> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Observations for a single location, ascending by timestamp with no
/// repeated timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSeries {
    rows: Vec<WeatherObservation>,
}

impl ObservationSeries {
    /// Sort rows by timestamp. When a timestamp repeats, the row that came
    /// later in the input wins.
    pub fn from_unsorted(mut rows: Vec<WeatherObservation>) -> Self {
        // stable sort keeps input order among equal timestamps
        rows.sort_by_key(|r| r.timestamp);
        let before = rows.len();
        rows.reverse();
        rows.dedup_by_key(|r| r.timestamp);
        rows.reverse();
        if rows.len() != before {
            tracing::warn!(
                "Dropped {} duplicate hourly rows while building a series",
                before - rows.len()
            );
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[WeatherObservation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The most recent `n` rows, or `None` if there are fewer.
    pub fn last_n(&self, n: usize) -> Option<&[WeatherObservation]> {
        self.rows.len().checked_sub(n).map(|start| &self.rows[start..])
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn obs(hour: u32, temp: f64) -> WeatherObservation {
        let mut values = [0.0; VARIABLE_COUNT];
        values[WeatherVariable::Temperature2m.index()] = temp;
        WeatherObservation {
            location: Location::new(39.0, -105.0),
            timestamp: Utc.with_ymd_and_hms(2025, 4, 9, hour, 0, 0).unwrap(),
            values,
        }
    }

    #[test]
    fn test_location_is_a_map_key() {
        let mut map = BTreeMap::new();
        map.insert(Location::new(39.5, -105.0), 1);
        map.insert(Location::new(39.0, -104.5), 2);
        map.insert(Location::new(39.5, -105.0), 3);

        assert_eq!(map.len(), 2);
        assert_eq!(map[&Location::new(39.5, -105.0)], 3);
        assert_eq!(map.keys().next(), Some(&Location::new(39.0, -104.5)));
    }

    #[test]
    fn test_series_sorts_ascending() {
        let series = ObservationSeries::from_unsorted(vec![obs(3, 3.0), obs(1, 1.0), obs(2, 2.0)]);
        let temps: Vec<f64> = series
            .rows()
            .iter()
            .map(|r| r.value(WeatherVariable::Temperature2m))
            .collect();
        assert_eq!(temps, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_series_keeps_last_duplicate() {
        let series = ObservationSeries::from_unsorted(vec![obs(1, 1.0), obs(1, 9.0), obs(2, 2.0)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.rows()[0].value(WeatherVariable::Temperature2m), 9.0);
    }

    #[test]
    fn test_last_n() {
        let series = ObservationSeries::from_unsorted((0..5).map(|h| obs(h, h as f64)).collect());
        let tail = series.last_n(2).unwrap();
        assert_eq!(tail[0].value(WeatherVariable::Temperature2m), 3.0);
        assert!(series.last_n(6).is_none());
    }
}
