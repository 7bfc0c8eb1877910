//! OpenAI-compatible chat-completions client (Groq, Ollama, or a custom endpoint).

use super::request_builder::{build_chat_request_body, extract_completion_text};
use crate::protocol::ChatMessage;
use crate::settings::LlmSettings;
use std::time::Duration;

/// Longest provider error body kept in [`LlmError::Status`]
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("provider returned an empty answer")]
    EmptyAnswer,
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    /// Build a client, or `None` when the provider needs a key that is not set.
    ///
    /// `None` means local mode: no outbound traffic at all.
    pub fn from_settings(settings: &LlmSettings) -> Result<Option<Self>, LlmError> {
        let api_key = settings.api_key().map(str::to_string);
        if settings.provider.requires_api_key() && api_key.is_none() {
            tracing::info!(
                provider = ?settings.provider,
                "No API key configured, answering from documents only"
            );
            return Ok(None);
        }

        let Some(base_url) = settings.effective_base_url() else {
            tracing::warn!(
                provider = ?settings.provider,
                "No base URL configured, answering from documents only"
            );
            return Ok(None);
        };

        let timeout = Duration::from_secs(settings.timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Transport)?;

        let client = Self {
            http,
            endpoint: format!("{}/chat/completions", base_url),
            model: settings.effective_model(),
            api_key,
            timeout,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };
        tracing::info!(endpoint = %client.endpoint, model = %client.model, "LLM client configured");
        Ok(Some(client))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one system + user exchange and return the answer text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let messages = [ChatMessage::system(system), ChatMessage::user(user)];
        let body =
            build_chat_request_body(&self.model, &messages, self.temperature, self.max_tokens);

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.map_reqwest_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_reqwest_error(e))?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| LlmError::MalformedResponse(format!("invalid JSON: {}", e)))?;
        let answer = extract_completion_text(&json).ok_or_else(|| {
            LlmError::MalformedResponse("missing choices[0].message.content".to_string())
        })?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(LlmError::EmptyAnswer);
        }
        Ok(answer.to_string())
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout)
        } else {
            LlmError::Transport(e)
        }
    }
}
