use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::{
    chat::{ChatError, ChatMessage, ChatProvider, ChatRequest, ChatRole},
    config::ChatSettings,
};

const CLIENT_NAME: &str = "OserTravel-Bot";
const TEMPERATURE: f64 = 0.3;
const TIMEOUT_SECS: u64 = 60;

/// Cohere v1 chat endpoint.
#[derive(Debug, Clone)]
pub struct CohereClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    http: Client,
}

impl CohereClient {
    pub fn new(settings: &ChatSettings) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| ChatError::Network(e.to_string()))?;

        Ok(Self {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            http,
        })
    }
}

#[derive(Debug, Serialize)]
struct CoTurn<'a> {
    role: &'static str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct CoChatBody<'a> {
    message: &'a str,
    preamble: &'a str,
    model: &'a str,
    temperature: f64,
    chat_history: Vec<CoTurn<'a>>,
}

#[derive(Debug, Deserialize)]
struct CoChatResponse {
    text: String,
}

fn cohere_role(message: &ChatMessage) -> &'static str {
    match message.role {
        ChatRole::User => "USER",
        ChatRole::Assistant => "CHATBOT",
        ChatRole::System => "SYSTEM",
    }
}

#[async_trait]
impl ChatProvider for CohereClient {
    fn ensure_ready(&self) -> Result<(), ChatError> {
        self.api_key.as_ref().map(|_| ()).ok_or(ChatError::MissingApiKey)
    }

    #[instrument(skip(self, request), fields(history = request.history.len()))]
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::MissingApiKey)?;

        let body = CoChatBody {
            message: request.message,
            preamble: &request.system.content,
            model: &self.model,
            temperature: TEMPERATURE,
            chat_history: request
                .history
                .iter()
                .map(|m| CoTurn { role: cohere_role(m), message: &m.content })
                .collect(),
        };

        let url = format!("{}/v1/chat", self.base_url);
        debug!(url = %url, model = %self.model, "Sending chat request");

        let res = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .header("X-Client-Name", CLIENT_NAME)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        match res.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => return Err(ChatError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(ChatError::QuotaExceeded),
            status => return Err(ChatError::Server(status.as_u16())),
        }

        let parsed: CoChatResponse =
            res.json().await.map_err(|e| ChatError::InvalidResponse(e.to_string()))?;

        Ok(parsed.text)
    }
}
