//! The twelve hourly weather variables the classifier was trained on.
//!
//! `WeatherVariable::ALL` is the canonical order. Feature vectors are laid
//! out in this order within every step, so it must never be reordered.

use serde::{Deserialize, Serialize};

pub const VARIABLE_COUNT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherVariable {
    #[serde(rename = "temperature_2m")]
    Temperature2m,
    Precipitation,
    Rain,
    Snowfall,
    SurfacePressure,
    #[serde(rename = "wind_speed_10m")]
    WindSpeed10m,
    #[serde(rename = "wind_gusts_10m")]
    WindGusts10m,
    #[serde(rename = "wind_direction_10m")]
    WindDirection10m,
    #[serde(rename = "soil_moisture_0_to_7cm")]
    SoilMoisture0To7cm,
    CloudCover,
    #[serde(rename = "soil_temperature_0_to_7cm")]
    SoilTemperature0To7cm,
    TerrestrialRadiation,
}

impl WeatherVariable {
    /// Canonical order.
    pub const ALL: [WeatherVariable; VARIABLE_COUNT] = [
        Self::Temperature2m,
        Self::Precipitation,
        Self::Rain,
        Self::Snowfall,
        Self::SurfacePressure,
        Self::WindSpeed10m,
        Self::WindGusts10m,
        Self::WindDirection10m,
        Self::SoilMoisture0To7cm,
        Self::CloudCover,
        Self::SoilTemperature0To7cm,
        Self::TerrestrialRadiation,
    ];

    /// Column name used by the archive source, the day cache and feature names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Temperature2m => "temperature_2m",
            Self::Precipitation => "precipitation",
            Self::Rain => "rain",
            Self::Snowfall => "snowfall",
            Self::SurfacePressure => "surface_pressure",
            Self::WindSpeed10m => "wind_speed_10m",
            Self::WindGusts10m => "wind_gusts_10m",
            Self::WindDirection10m => "wind_direction_10m",
            Self::SoilMoisture0To7cm => "soil_moisture_0_to_7cm",
            Self::CloudCover => "cloud_cover",
            Self::SoilTemperature0To7cm => "soil_temperature_0_to_7cm",
            Self::TerrestrialRadiation => "terrestrial_radiation",
        }
    }

    /// Position in the canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

/// Forecast columns whose upstream labels are swapped relative to the
/// archive source. Applied to forecast responses only.
///
/// Upstream `soil_temperature_6cm` carries what the archive calls
/// `soil_moisture_0_to_7cm`, and `soil_moisture_1_to_3cm` carries
/// `soil_temperature_0_to_7cm`. Remove this table once the forecast source
/// is verified to label them consistently.
pub const FORECAST_RENAMES: [(&str, WeatherVariable); 2] = [
    ("soil_temperature_6cm", WeatherVariable::SoilMoisture0To7cm),
    ("soil_moisture_1_to_3cm", WeatherVariable::SoilTemperature0To7cm),
];

/// Hourly variables requested from the forecast source.
pub const FORECAST_REQUEST: [&str; VARIABLE_COUNT] = [
    "temperature_2m",
    "wind_direction_10m",
    "wind_speed_10m",
    "surface_pressure",
    "precipitation",
    "wind_gusts_10m",
    "rain",
    "snowfall",
    "cloud_cover",
    "soil_temperature_6cm",
    "soil_moisture_1_to_3cm",
    "terrestrial_radiation",
];

/// Hourly variables requested from the archive source (already canonical).
pub fn historical_request() -> [&'static str; VARIABLE_COUNT] {
    WeatherVariable::ALL.map(WeatherVariable::name)
}

/// Map a forecast column name to the variable it holds.
pub fn forecast_variable(column: &str) -> Option<WeatherVariable> {
    FORECAST_RENAMES
        .iter()
        .find(|(upstream, _)| *upstream == column)
        .map(|(_, var)| *var)
        .or_else(|| WeatherVariable::from_name(column))
}

/// Map an archive column name to the variable it holds.
pub fn historical_variable(column: &str) -> Option<WeatherVariable> {
    WeatherVariable::from_name(column)
}
