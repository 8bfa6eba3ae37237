use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, instrument};

use crate::{
    config::WeatherSettings,
    model::{self, CurrentConditions, HourlySeries, WeatherSnapshot},
    provider::{FetchError, WeatherProvider, validate_coordinates},
};

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,apparent_temperature,is_day,wind_speed_10m,weather_code";
const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code";

/// Open-Meteo forecast client. No API key required.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(settings: &WeatherSettings) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    apparent_temperature: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    is_day: u8,
    weather_code: i32,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<f64>,
    relative_humidity_2m: Vec<f64>,
    wind_speed_10m: Vec<f64>,
    weather_code: Vec<i32>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current: OmCurrent,
    #[serde(default)]
    current_units: BTreeMap<String, String>,
    hourly: OmHourly,
    #[serde(default)]
    utc_offset_seconds: i32,
}

impl TryFrom<OmResponse> for WeatherSnapshot {
    type Error = FetchError;

    fn try_from(parsed: OmResponse) -> Result<Self, Self::Error> {
        let hourly = HourlySeries::new(
            parsed.hourly.time,
            parsed.hourly.temperature_2m,
            parsed.hourly.relative_humidity_2m,
            parsed.hourly.wind_speed_10m,
            parsed.hourly.weather_code,
        )
        .map_err(|e| FetchError::Parse(e.to_string()))?;

        let mut current_units = parsed.current_units;
        // `time` and `interval` are metadata, not indicators.
        current_units.retain(|field, _| {
            [
                model::fields::TEMPERATURE,
                model::fields::APPARENT_TEMPERATURE,
                model::fields::RELATIVE_HUMIDITY,
                model::fields::WIND_SPEED,
                model::fields::IS_DAY,
                model::fields::WEATHER_CODE,
            ]
            .contains(&field.as_str())
        });

        Ok(WeatherSnapshot {
            current: CurrentConditions {
                temperature: parsed.current.temperature_2m,
                apparent_temperature: parsed.current.apparent_temperature,
                relative_humidity: parsed.current.relative_humidity_2m,
                wind_speed: parsed.current.wind_speed_10m,
                is_day: parsed.current.is_day != 0,
                weather_code: parsed.current.weather_code,
            },
            current_units,
            hourly,
            utc_offset_seconds: parsed.utc_offset_seconds,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    #[instrument(skip(self), fields(lat = %latitude, lon = %longitude))]
    async fn fetch_snapshot(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, FetchError> {
        validate_coordinates(latitude, longitude)?;

        let url = format!("{}/forecast", self.base_url);
        let (lat, lon) = (latitude.to_string(), longitude.to_string());
        debug!(url = %url, "Fetching current and hourly weather");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", lat.as_str()),
                ("longitude", lon.as_str()),
                ("current", CURRENT_FIELDS),
                ("hourly", HOURLY_FIELDS),
                ("timezone", "auto"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = res.text().await.map_err(|e| FetchError::Network(e.to_string()))?;

        let parsed: OmResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

        WeatherSnapshot::try_from(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> serde_json::Value {
        serde_json::json!({
            "utc_offset_seconds": -18000,
            "current_units": {
                "time": "iso8601",
                "interval": "seconds",
                "temperature_2m": "°C",
                "relative_humidity_2m": "%",
                "apparent_temperature": "°C",
                "is_day": "",
                "wind_speed_10m": "km/h",
                "weather_code": "wmo code"
            },
            "current": {
                "time": "2024-01-01T11:00",
                "interval": 900,
                "temperature_2m": 27.4,
                "relative_humidity_2m": 74,
                "apparent_temperature": 31.2,
                "is_day": 1,
                "wind_speed_10m": 11.9,
                "weather_code": 2
            },
            "hourly": {
                "time": ["2024-01-01T10:00", "2024-01-01T11:00"],
                "temperature_2m": [26.0, 27.4],
                "relative_humidity_2m": [78, 74],
                "wind_speed_10m": [9.0, 11.9],
                "weather_code": [1, 2]
            }
        })
    }

    #[test]
    fn maps_wire_payload_into_snapshot() {
        let parsed: OmResponse = serde_json::from_value(sample()).unwrap();
        let snapshot = WeatherSnapshot::try_from(parsed).unwrap();

        assert_eq!(snapshot.current.temperature, 27.4);
        assert_eq!(snapshot.current.relative_humidity, 74.0);
        assert!(snapshot.current.is_day);
        assert_eq!(snapshot.unit(model::fields::WIND_SPEED), "km/h");
        assert!(!snapshot.current_units.contains_key("interval"));
        assert_eq!(snapshot.hourly.len(), 2);
        assert_eq!(snapshot.utc_offset_seconds, -18_000);
    }

    #[test]
    fn missing_offset_defaults_to_utc() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("utc_offset_seconds");

        let parsed: OmResponse = serde_json::from_value(value).unwrap();
        assert_eq!(WeatherSnapshot::try_from(parsed).unwrap().utc_offset_seconds, 0);
    }

    #[test]
    fn misaligned_hourly_payload_is_a_parse_error() {
        let mut value = sample();
        value["hourly"]["weather_code"] = serde_json::json!([1]);

        let parsed: OmResponse = serde_json::from_value(value).unwrap();
        let err = WeatherSnapshot::try_from(parsed).unwrap_err();

        assert!(matches!(err, FetchError::Parse(msg) if msg.contains("weather_code")));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let settings = WeatherSettings {
            base_url: "http://localhost:1234/v1/".into(),
            timeout_secs: 1,
        };
        let provider = OpenMeteoProvider::new(&settings).unwrap();
        assert_eq!(provider.base_url, "http://localhost:1234/v1");
    }
}
