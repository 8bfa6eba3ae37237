//! 24-hour display window over the hourly forecast.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use serde::Serialize;

use crate::model::HourlySeries;

pub const WINDOW_LEN: usize = 24;

/// Display icon for a WMO weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WeatherIcon {
    Clear,
    MostlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    Rain,
    Snow,
    Storm,
    Unknown,
}

impl WeatherIcon {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => WeatherIcon::Clear,
            1 => WeatherIcon::MostlyClear,
            2 => WeatherIcon::PartlyCloudy,
            3 => WeatherIcon::Overcast,
            45 | 48 => WeatherIcon::Fog,
            51..=67 | 80..=82 => WeatherIcon::Rain,
            71..=77 => WeatherIcon::Snow,
            95.. => WeatherIcon::Storm,
            _ => WeatherIcon::Unknown,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            WeatherIcon::Clear => "☀️",
            WeatherIcon::MostlyClear => "🌤️",
            WeatherIcon::PartlyCloudy => "⛅",
            WeatherIcon::Overcast => "☁️",
            WeatherIcon::Fog => "🌫️",
            WeatherIcon::Rain => "🌧️",
            WeatherIcon::Snow => "❄️",
            WeatherIcon::Storm => "⛈️",
            WeatherIcon::Unknown => "🌡️",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WeatherIcon::Clear => "Despejado",
            WeatherIcon::MostlyClear => "Mayormente despejado",
            WeatherIcon::PartlyCloudy => "Parcialmente nublado",
            WeatherIcon::Overcast => "Nublado",
            WeatherIcon::Fog => "Niebla",
            WeatherIcon::Rain => "Lluvia",
            WeatherIcon::Snow => "Nieve",
            WeatherIcon::Storm => "Tormenta",
            WeatherIcon::Unknown => "Desconocido",
        }
    }
}

/// Index-aligned display columns for the selected hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlyWindow {
    /// Index of the first entry within the source series.
    pub start: usize,
    pub hours: Vec<String>,
    pub icons: Vec<WeatherIcon>,
    pub temperatures: Vec<i64>,
    pub humidity: Vec<f64>,
    pub wind_speed: Vec<f64>,
}

impl HourlyWindow {
    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }
}

/// Current hour of the day at the location, given the forecast's UTC offset.
pub fn current_hour_at(utc_offset_seconds: i32) -> u32 {
    hour_at(Utc::now(), utc_offset_seconds)
}

/// Hour of `now` shifted by `utc_offset_seconds`. An offset outside ±24 h is
/// treated as UTC.
pub fn hour_at(now: DateTime<Utc>, utc_offset_seconds: i32) -> u32 {
    match FixedOffset::east_opt(utc_offset_seconds) {
        Some(offset) => now.with_timezone(&offset).hour(),
        None => now.hour(),
    }
}

/// Slice up to [`WINDOW_LEN`] entries starting at the first timestamp whose
/// hour equals `current_hour` (index 0 when none does). Clamps at the end of
/// the series instead of wrapping.
pub fn derive_window(hourly: &HourlySeries, current_hour: u32) -> HourlyWindow {
    let parsed: Vec<Option<NaiveDateTime>> =
        hourly.time().iter().map(String::as_str).map(parse_timestamp).collect();

    let start = parsed
        .iter()
        .position(|ts| ts.is_some_and(|ts| ts.hour() == current_hour))
        .unwrap_or(0);
    let end = (start + WINDOW_LEN).min(hourly.len());
    let range = start..end;

    HourlyWindow {
        start,
        hours: hourly.time()[range.clone()]
            .iter()
            .zip(&parsed[range.clone()])
            .map(|(raw, ts)| match ts {
                Some(ts) => ts.format("%H:%M").to_string(),
                None => raw.clone(),
            })
            .collect(),
        icons: hourly.weather_code()[range.clone()]
            .iter()
            .map(|&code| WeatherIcon::from_code(code))
            .collect(),
        temperatures: hourly.temperature()[range.clone()]
            .iter()
            .map(|&t| round_temperature(t))
            .collect(),
        humidity: hourly.humidity()[range.clone()].to_vec(),
        wind_speed: hourly.wind_speed()[range].to_vec(),
    }
}

/// Round half away from zero: 21.5 → 22, -21.5 → -22.
pub fn round_temperature(value: f64) -> i64 {
    value.round() as i64
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(hours: usize) -> HourlySeries {
        let time = (0..hours)
            .map(|i| format!("2024-01-{:02}T{:02}:00", 1 + i / 24, i % 24))
            .collect();
        let values: Vec<f64> = (0..hours).map(|i| i as f64).collect();
        HourlySeries::new(
            time,
            values.clone(),
            values.iter().map(|v| v + 50.0).collect(),
            values.iter().map(|v| v / 2.0).collect(),
            vec![0; hours],
        )
        .unwrap()
    }

    #[test]
    fn icon_bands() {
        let cases = [
            (0, WeatherIcon::Clear),
            (1, WeatherIcon::MostlyClear),
            (2, WeatherIcon::PartlyCloudy),
            (3, WeatherIcon::Overcast),
            (45, WeatherIcon::Fog),
            (48, WeatherIcon::Fog),
            (51, WeatherIcon::Rain),
            (61, WeatherIcon::Rain),
            (67, WeatherIcon::Rain),
            (80, WeatherIcon::Rain),
            (82, WeatherIcon::Rain),
            (71, WeatherIcon::Snow),
            (77, WeatherIcon::Snow),
            (95, WeatherIcon::Storm),
            (99, WeatherIcon::Storm),
        ];
        for (code, icon) in cases {
            assert_eq!(WeatherIcon::from_code(code), icon, "code {code}");
        }
    }

    #[test]
    fn codes_outside_every_band_are_unknown() {
        for code in [-1, 4, 44, 46, 50, 68, 70, 78, 79, 83, 94] {
            assert_eq!(WeatherIcon::from_code(code), WeatherIcon::Unknown, "code {code}");
        }
    }

    #[test]
    fn code_100_is_unknown() {
        assert_eq!(WeatherIcon::from_code(100), WeatherIcon::Unknown);
    }

    #[test]
    fn window_starts_at_current_hour() {
        let hourly = HourlySeries::new(
            vec!["2024-01-01T10:00".into(), "2024-01-01T11:00".into(), "2024-01-01T12:00".into()],
            vec![20.1, 21.6, 19.9],
            vec![70.0, 71.0, 72.0],
            vec![5.0, 6.0, 7.0],
            vec![61, 3, 100],
        )
        .unwrap();

        let window = derive_window(&hourly, 11);

        assert_eq!(window.start, 1);
        assert_eq!(window.hours, vec!["11:00", "12:00"]);
        assert_eq!(window.temperatures, vec![22, 20]);
        assert_eq!(window.icons, vec![WeatherIcon::Overcast, WeatherIcon::Unknown]);
        assert_eq!(window.humidity, vec![71.0, 72.0]);
        assert_eq!(window.wind_speed, vec![6.0, 7.0]);
    }

    #[test]
    fn missing_hour_falls_back_to_first_entry() {
        let hourly = HourlySeries::new(
            vec!["2024-01-01T10:00".into(), "2024-01-01T11:00".into()],
            vec![20.0, 21.0],
            vec![70.0, 71.0],
            vec![5.0, 6.0],
            vec![0, 0],
        )
        .unwrap();

        let window = derive_window(&hourly, 3);

        assert_eq!(window.start, 0);
        assert_eq!(window.hours[0], "10:00");
    }

    #[test]
    fn window_is_exactly_24_when_enough_data() {
        let hourly = series(7 * 24);
        let window = derive_window(&hourly, 5);

        assert_eq!(window.start, 5);
        assert_eq!(window.len(), WINDOW_LEN);
        assert_eq!(window.hours.first().map(String::as_str), Some("05:00"));
        assert_eq!(window.hours.last().map(String::as_str), Some("04:00"));
    }

    #[test]
    fn window_clamps_at_end_of_series() {
        let hourly = series(30);

        // Hour 20 first appears at index 20, leaving 10 entries.
        let window = derive_window(&hourly, 20);

        assert_eq!(window.start, 20);
        assert_eq!(window.len(), 10);
        assert_eq!(window.icons.len(), 10);
        assert_eq!(window.temperatures.len(), 10);
        assert_eq!(window.humidity.len(), 10);
        assert_eq!(window.wind_speed.len(), 10);
    }

    #[test]
    fn window_length_matches_min_rule_for_every_hour() {
        for n in [0usize, 1, 5, 23, 24, 25, 48, 72] {
            let hourly = series(n);
            for hour in 0..24 {
                let window = derive_window(&hourly, hour);
                let start = if (hour as usize) < n { hour as usize } else { 0 };
                assert_eq!(window.start, start, "n={n} hour={hour}");
                assert_eq!(window.len(), WINDOW_LEN.min(n - start), "n={n} hour={hour}");
            }
        }
    }

    #[test]
    fn empty_series_gives_empty_window() {
        let window = derive_window(&series(0), 12);
        assert!(window.is_empty());
        assert_eq!(window, HourlyWindow::default());
    }

    #[test]
    fn unparseable_timestamp_keeps_raw_label_and_never_matches() {
        let hourly = HourlySeries::new(
            vec!["mañana".into(), "2024-01-01T11:00:00".into()],
            vec![20.0, 21.0],
            vec![70.0, 71.0],
            vec![5.0, 6.0],
            vec![0, 0],
        )
        .unwrap();

        assert_eq!(derive_window(&hourly, 11).start, 1);

        let fallback = derive_window(&hourly, 9);
        assert_eq!(fallback.hours, vec!["mañana", "11:00"]);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_temperature(21.5), 22);
        assert_eq!(round_temperature(-21.5), -22);
        assert_eq!(round_temperature(21.49), 21);
        assert_eq!(round_temperature(-0.4), 0);
        assert_eq!(round_temperature(19.9), 20);
    }

    #[test]
    fn hour_follows_the_location_offset_not_the_host_clock() {
        let now = DateTime::parse_from_rfc3339("2024-01-01T03:30:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(hour_at(now, -5 * 3600), 22);
        assert_eq!(hour_at(now, 0), 3);
        assert_eq!(hour_at(now, 5 * 3600 + 1800), 9);
        // Out of range offsets fall back to UTC.
        assert_eq!(hour_at(now, 90_000), 3);
    }

    #[test]
    fn city_hour_selects_the_matching_window_start() {
        let now = DateTime::parse_from_rfc3339("2024-01-01T15:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let window = derive_window(&series(48), hour_at(now, -5 * 3600));
        assert_eq!(window.start, 10);
        assert_eq!(window.hours[0], "10:00");
    }
}
