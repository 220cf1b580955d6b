//! Ollama chat provider
//!
//! Thin client for Ollama's native chat API:
//! `POST {endpoint}/api/chat` with `stream = false`.

use super::{CompletionProvider, ProviderError, error_chain};
use crate::config::OllamaConfig;
use crate::conversation::Conversation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest slice of an upstream error body surfaced to callers
const ERROR_SNIPPET_CHARS: usize = 240;

/// Completion provider backed by a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    model_id: String,
    chat_url: String,
}

impl OllamaProvider {
    /// Build a provider from validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: &OllamaConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()
            .map_err(|e| ProviderError::Configuration(format!("HTTP client: {}", e)))?;

        let chat_url = format!("{}/api/chat", config.endpoint().trim_end_matches('/'));

        tracing::info!(
            model_id = %config.model_id(),
            chat_url = %chat_url,
            timeout_seconds = config.timeout_seconds(),
            "Ollama provider configured"
        );

        Ok(Self {
            client,
            model_id: config.model_id().to_string(),
            chat_url,
        })
    }

    /// Full URL of the chat endpoint
    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, conversation: &Conversation) -> Result<String, ProviderError> {
        let body = ChatRequestBody::new(&self.model_id, conversation);

        tracing::debug!(
            url = %self.chat_url,
            model_id = %self.model_id,
            turns = conversation.len(),
            "POST chat completion"
        );

        let response = self.client.post(&self.chat_url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                url: self.chat_url.clone(),
                message: upstream_error_message(&text),
            });
        }

        let out: ChatResponseBody = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(error_chain(&e)))?;

        Ok(out.message.content)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Pull Ollama's `{"error": "..."}` text out of a failure body, or fall back to a snippet
fn upstream_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.chars().take(ERROR_SNIPPET_CHARS).collect(),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

impl<'a> ChatRequestBody<'a> {
    fn new(model: &'a str, conversation: &'a Conversation) -> Self {
        Self {
            model,
            messages: conversation
                .turns()
                .iter()
                .map(|turn| WireMessage {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            stream: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}
