use crate::model::WeatherSnapshot;
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

pub mod openmeteo;

pub use openmeteo::OpenMeteoProvider;

/// Why a weather fetch ended without data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Coordenadas inválidas ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("No se pudo conectar con el servicio del clima: {0}")]
    Network(String),

    #[error("El servicio del clima respondió con estado {0}")]
    Status(u16),

    #[error("Respuesta del clima inválida: {0}")]
    Parse(String),
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// One request for current and hourly conditions at a point. No retries.
    async fn fetch_snapshot(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, FetchError>;
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), FetchError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(FetchError::InvalidCoordinates { latitude, longitude });
    }
    Ok(())
}
