//! Plain-text rendering of the dashboard panels.

use clima_core::{
    CityConfig, FetchState, WeatherSnapshot,
    model::fields,
    window::{HourlyWindow, WeatherIcon},
};

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Loading and error placeholders; `None` once data is available.
pub fn fetch_status(state: &FetchState) -> Option<String> {
    match state {
        FetchState::Loading => Some("Cargando datos...".to_string()),
        FetchState::Error(message) => Some(format!("Error: {message}")),
        FetchState::Data(_) => None,
    }
}

pub fn header(city: &CityConfig, snapshot: &WeatherSnapshot) -> String {
    let icon = WeatherIcon::from_code(snapshot.current.weather_code);
    let moment = if snapshot.current.is_day { "día" } else { "noche" };
    format!(
        "Dashboard del clima: {} ({:.4}, {:.4})\n{} {} · {moment}",
        city.name,
        city.latitude,
        city.longitude,
        icon.glyph(),
        icon.description(),
    )
}

pub fn indicators(snapshot: &WeatherSnapshot) -> String {
    let c = &snapshot.current;
    let cards = [
        ("Temperatura (2m)", c.temperature, fields::TEMPERATURE),
        ("Temperatura Aparente", c.apparent_temperature, fields::APPARENT_TEMPERATURE),
        ("Humedad Relativa (2m)", c.relative_humidity, fields::RELATIVE_HUMIDITY),
        ("Velocidad del Viento (10m)", c.wind_speed, fields::WIND_SPEED),
    ];

    let mut out = String::new();
    for (title, value, field) in cards {
        out.push_str(&format!("  {title:<28} {value} {}\n", snapshot.unit(field)));
    }
    out
}

/// Rain alert over the window: the first hour with rain or storm, if any.
pub fn alert(window: &HourlyWindow) -> String {
    let wet = window
        .icons
        .iter()
        .position(|icon| matches!(icon, WeatherIcon::Rain | WeatherIcon::Storm));

    match wet {
        Some(i) => format!(
            "⚠️ Alerta: se preveen lluvias desde las {} ({})",
            window.hours[i],
            window.icons[i].description()
        ),
        None => "✅ No se preveen lluvias".to_string(),
    }
}

pub fn chart(window: &HourlyWindow) -> String {
    let mut out = String::from("Horas vs Temperatura & Velocidad de Viento\n");
    if window.is_empty() {
        out.push_str("  No hay datos\n");
        return out;
    }

    let temps: Vec<f64> = window.temperatures.iter().map(|&t| t as f64).collect();
    out.push_str(&format!("  Temperatura  {}  {}\n", sparkline(&temps), range_label(&temps)));
    out.push_str(&format!(
        "  Viento       {}  {}\n",
        sparkline(&window.wind_speed),
        range_label(&window.wind_speed)
    ));

    let first = &window.hours[0];
    let last = &window.hours[window.len() - 1];
    let gap = window.len().saturating_sub(first.chars().count() + last.chars().count());
    out.push_str(&format!("               {first}{}{last}\n", " ".repeat(gap)));
    out
}

pub fn table(window: &HourlyWindow, temperature_unit: &str, wind_unit: &str) -> String {
    let mut out = format!(
        "  {:<6} {:<3} {:>8} {:>8} {:>12}\n",
        "Hora", "", "Temp", "Humedad", "Viento"
    );

    for i in 0..window.len() {
        out.push_str(&format!(
            "  {:<6} {:<3} {:>8} {:>8} {:>12}\n",
            window.hours[i],
            window.icons[i].glyph(),
            format!("{} {temperature_unit}", window.temperatures[i]),
            format!("{}%", window.humidity[i]),
            format!("{} {wind_unit}", window.wind_speed[i]),
        ));
    }
    out
}

pub fn dashboard(city: &CityConfig, snapshot: &WeatherSnapshot, window: &HourlyWindow) -> String {
    [
        header(city, snapshot),
        alert(window),
        indicators(snapshot),
        chart(window),
        table(window, snapshot.unit(fields::TEMPERATURE), snapshot.unit(fields::WIND_SPEED)),
    ]
    .join("\n")
}

fn sparkline(values: &[f64]) -> String {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = (max - min).max(0.001);

    values
        .iter()
        .map(|v| {
            let norm = ((v - min) / span).clamp(0.0, 1.0);
            BARS[(norm * (BARS.len() - 1) as f64).round() as usize]
        })
        .collect()
}

fn range_label(values: &[f64]) -> String {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    format!("{min}–{max}")
}
