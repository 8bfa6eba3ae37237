use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Open-Meteo field names, used as keys of [`WeatherSnapshot::current_units`].
pub mod fields {
    pub const TEMPERATURE: &str = "temperature_2m";
    pub const APPARENT_TEMPERATURE: &str = "apparent_temperature";
    pub const RELATIVE_HUMIDITY: &str = "relative_humidity_2m";
    pub const WIND_SPEED: &str = "wind_speed_10m";
    pub const IS_DAY: &str = "is_day";
    pub const WEATHER_CODE: &str = "weather_code";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub relative_humidity: f64,
    pub wind_speed: f64,
    pub is_day: bool,
    pub weather_code: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("hourly series '{field}' has {actual} entries, expected {expected}")]
pub struct MisalignedSeries {
    pub field: &'static str,
    pub expected: usize,
    pub actual: usize,
}

/// Hourly forecast columns. Every column has the same length as `time`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySeries {
    time: Vec<String>,
    temperature: Vec<f64>,
    humidity: Vec<f64>,
    wind_speed: Vec<f64>,
    weather_code: Vec<i32>,
}

impl HourlySeries {
    pub fn new(
        time: Vec<String>,
        temperature: Vec<f64>,
        humidity: Vec<f64>,
        wind_speed: Vec<f64>,
        weather_code: Vec<i32>,
    ) -> Result<Self, MisalignedSeries> {
        let expected = time.len();
        let columns = [
            ("temperature", temperature.len()),
            ("humidity", humidity.len()),
            ("wind_speed", wind_speed.len()),
            ("weather_code", weather_code.len()),
        ];

        if let Some((field, actual)) = columns.into_iter().find(|(_, len)| *len != expected) {
            return Err(MisalignedSeries { field, expected, actual });
        }

        Ok(Self { time, temperature, humidity, wind_speed, weather_code })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[String] {
        &self.time
    }

    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    pub fn humidity(&self) -> &[f64] {
        &self.humidity
    }

    pub fn wind_speed(&self) -> &[f64] {
        &self.wind_speed
    }

    pub fn weather_code(&self) -> &[i32] {
        &self.weather_code
    }
}

/// One fetched payload: current conditions plus the hourly forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    pub current_units: BTreeMap<String, String>,
    pub hourly: HourlySeries,
    /// Offset of the location's timezone; hourly timestamps are in this zone.
    pub utc_offset_seconds: i32,
}

impl WeatherSnapshot {
    /// Unit string for a current-conditions field, empty when the API sent none.
    pub fn unit(&self, field: &str) -> &str {
        self.current_units.get(field).map(String::as_str).unwrap_or("")
    }
}
