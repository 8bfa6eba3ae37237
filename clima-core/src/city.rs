use anyhow::anyhow;
use serde::Serialize;

/// A selectable city. Immutable; the catalogue below is the only source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CityConfig {
    pub key: &'static str,
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

static CITIES: [CityConfig; 4] = [
    CityConfig { key: "guayaquil", name: "Guayaquil", latitude: -2.170998, longitude: -79.922359 },
    CityConfig { key: "quito", name: "Quito", latitude: -0.180653, longitude: -78.467838 },
    CityConfig { key: "manta", name: "Manta", latitude: -0.947083, longitude: -80.708506 },
    CityConfig { key: "cuenca", name: "Cuenca", latitude: -2.90055, longitude: -79.00472 },
];

/// All cities, in display order.
pub fn cities() -> &'static [CityConfig] {
    &CITIES
}

pub fn default_city() -> &'static CityConfig {
    &CITIES[0]
}

/// Look a city up by key, ignoring case and surrounding whitespace.
pub fn city(key: &str) -> anyhow::Result<&'static CityConfig> {
    let wanted = key.trim().to_lowercase();

    CITIES.iter().find(|c| c.key == wanted).ok_or_else(|| {
        let known: Vec<&str> = CITIES.iter().map(|c| c.key).collect();
        anyhow!("Unknown city '{key}'. Supported cities: {}.", known.join(", "))
    })
}

impl std::fmt::Display for CityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}
