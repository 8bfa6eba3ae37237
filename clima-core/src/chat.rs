//! Weather-aware chat assistant: history, throttling and provider calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    model::{WeatherSnapshot, fields},
    rate_limit::{ChatRateLimiter, RateDecision},
    store::{KeyValueStore, StoreError},
    window::WeatherIcon,
};

pub mod cohere;

pub use cohere::CohereClient;

const PERSONA: &str = "Eres el asistente virtual de la agencia de viajes \"OserTravel\". \
Eres amable, profesional y experto en turismo en Ecuador.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }
}

/// Every way a send can fail. The Display strings are shown to the user as-is.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Falta la API Key del asistente. Ejecuta `clima configure` o define COHERE_API_KEY.")]
    MissingApiKey,

    #[error("API Key inválida.")]
    Unauthorized,

    #[error("Cuota de API excedida.")]
    QuotaExceeded,

    #[error("Error del servidor ({0})")]
    Server(u16),

    #[error("Error al conectar con el asistente.")]
    Network(String),

    #[error("Respuesta inválida del asistente: {0}")]
    InvalidResponse(String),

    #[error("⚠️ Límite alcanzado. Espera {retry_after_secs} segundos.")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a provider receives for one turn.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub system: ChatMessage,
    /// Earlier turns, oldest first. Does not include `message`.
    pub history: &'a [ChatMessage],
    pub message: &'a str,
}

#[async_trait]
pub trait ChatProvider: Send + Sync + Debug {
    /// Fails when the provider cannot send at all (e.g. no credentials).
    /// Checked before a turn consumes any quota.
    fn ensure_ready(&self) -> Result<(), ChatError> {
        Ok(())
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, ChatError>;
}

/// Persona instructions plus the latest weather, or a placeholder while it loads.
pub fn build_preamble(snapshot: Option<&WeatherSnapshot>) -> ChatMessage {
    let mut preamble = PERSONA.to_string();

    match snapshot {
        Some(s) => {
            let c = &s.current;
            preamble.push_str(&format!(
                "\n\n[DATOS EN TIEMPO REAL]\n\
                 El usuario está consultando desde una ubicación con este clima:\n\
                 - Temperatura: {} {}\n\
                 - Temperatura aparente: {} {}\n\
                 - Humedad relativa: {} {}\n\
                 - Viento: {} {}\n\
                 - Condición: {} (código {})\n\
                 - Momento del día: {}\n\
                 Usa estos datos si el usuario pregunta por recomendaciones de ropa \
                 o actividades ahora mismo.",
                c.temperature,
                s.unit(fields::TEMPERATURE),
                c.apparent_temperature,
                s.unit(fields::APPARENT_TEMPERATURE),
                c.relative_humidity,
                s.unit(fields::RELATIVE_HUMIDITY),
                c.wind_speed,
                s.unit(fields::WIND_SPEED),
                WeatherIcon::from_code(c.weather_code).description(),
                c.weather_code,
                if c.is_day { "día" } else { "noche" },
            ));
        }
        None => {
            preamble.push_str(
                "\n\n[DATOS EN TIEMPO REAL]\n\
                 Los datos del clima todavía se están cargando; no inventes valores.",
            );
        }
    }

    ChatMessage::system(preamble)
}

/// One conversation. Sends are serialized by `&mut self`.
#[derive(Debug)]
pub struct ChatSession<P, S> {
    provider: P,
    limiter: ChatRateLimiter<S>,
    messages: Vec<ChatMessage>,
}

impl<P: ChatProvider, S: KeyValueStore> ChatSession<P, S> {
    pub fn new(provider: P, limiter: ChatRateLimiter<S>) -> Self {
        Self { provider, limiter, messages: Vec::new() }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send one user turn.
    ///
    /// Blank input is ignored (`Ok(None)`). An unready provider or a throttled
    /// send makes no network call and leaves both the history and the throttle
    /// log untouched. Once the throttle passes, the user message stays in the
    /// history even if the provider call fails.
    pub async fn send(
        &mut self,
        input: &str,
        snapshot: Option<&WeatherSnapshot>,
    ) -> Result<Option<&ChatMessage>, ChatError> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(None);
        }

        self.provider.ensure_ready()?;

        if let RateDecision::Limited { retry_after_secs } = self.limiter.check()? {
            return Err(ChatError::RateLimited { retry_after_secs });
        }

        let prior = self.messages.len();
        self.messages.push(ChatMessage::user(text));

        let request = ChatRequest {
            system: build_preamble(snapshot),
            history: &self.messages[..prior],
            message: text,
        };
        debug!(history = prior, has_weather = snapshot.is_some(), "Sending chat turn");

        let reply = self.provider.complete(&request).await.inspect_err(|err| {
            warn!(error = ?err, "Chat provider call failed");
        })?;

        self.messages.push(ChatMessage::assistant(reply));
        Ok(self.messages.last())
    }
}
