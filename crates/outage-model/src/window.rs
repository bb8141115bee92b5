//! Per-location forward-looking windows.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use outage_weather::{Location, ObservationSeries, ObservationTable, WeatherObservation};

pub const DEFAULT_WINDOW_HOURS: i64 = 12;

/// Keeps, per location, the rows with `now <= timestamp < now + window`.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindowSelector {
    window: Duration,
}

impl Default for TimeWindowSelector {
    fn default() -> Self {
        Self::from_hours(DEFAULT_WINDOW_HOURS)
    }
}

impl TimeWindowSelector {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn from_hours(hours: i64) -> Self {
        Self::new(Duration::hours(hours))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Group the table by location and trim every group to the window.
    ///
    /// Locations with no rows inside the window are left out of the map.
    pub fn select(
        &self,
        table: &ObservationTable,
        now: DateTime<Utc>,
    ) -> BTreeMap<Location, ObservationSeries> {
        self.select_rows(table.rows(), now)
    }

    pub fn select_rows<'a>(
        &self,
        rows: impl IntoIterator<Item = &'a WeatherObservation>,
        now: DateTime<Utc>,
    ) -> BTreeMap<Location, ObservationSeries> {
        let end = now + self.window;
        let mut groups: BTreeMap<Location, Vec<WeatherObservation>> = BTreeMap::new();

        for row in rows {
            if row.timestamp >= now && row.timestamp < end {
                groups.entry(row.location).or_default().push(row.clone());
            }
        }

        groups
            .into_iter()
            .map(|(location, rows)| (location, ObservationSeries::from_unsorted(rows)))
            .collect()
    }
}
