//! Completion providers
//!
//! The relay talks to its language model through the [`CompletionProvider`]
//! trait so handlers can be exercised without a running inference server.

use crate::conversation::Conversation;
use async_trait::async_trait;
use thiserror::Error;

pub mod ollama;

pub use ollama::OllamaProvider;

/// Failure raised while producing a completion
///
/// Variants exist for diagnostics only. Handlers collapse all of them into a
/// single server-error response.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection refused, DNS failure, timeout and other client errors
    ///
    /// `message` carries the whole source chain; reqwest's own `Display`
    /// stops at "error sending request".
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success status
    #[error("Ollama returned HTTP {status} from {url}: {message}")]
    HttpStatus {
        status: u16,
        url: String,
        message: String,
    },

    /// Upstream body could not be decoded into a reply
    #[error("Failed to decode Ollama response: {0}")]
    Decode(String),

    /// Client could not be constructed from configuration
    #[error("Invalid provider configuration: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(source: reqwest::Error) -> Self {
        ProviderError::Transport {
            message: error_chain(&source),
            source,
        }
    }
}

impl ProviderError {
    /// True when the provider gave up waiting on the upstream
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Transport { source, .. } if source.is_timeout())
    }
}

/// Render an error followed by each of its sources, `": "`-separated
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        // Some layers repeat their inner error verbatim
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        current = cause.source();
    }
    rendered
}

/// Something that turns a conversation into reply text
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Produce the next assistant reply for `conversation`
    async fn complete(&self, conversation: &Conversation) -> Result<String, ProviderError>;

    /// Model identifier reported by `/health`
    fn model_id(&self) -> &str;
}
