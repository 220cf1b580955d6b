//! HTTP request handlers for the relay API

use crate::config::Config;
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::provider::CompletionProvider;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod chat;
pub mod extractor;
pub mod health;
pub mod metrics;

/// Application state shared across all handlers
///
/// Everything here is read-only after startup. All fields are Arc'd for
/// cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    provider: Arc<dyn CompletionProvider>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState from configuration and a completion provider
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics registry cannot be built.
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            config,
            provider,
            metrics: Arc::new(Metrics::new()?),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &dyn CompletionProvider {
        self.provider.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Build the relay's router with its middleware stack
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ollama/chat", post(chat::handler))
        .route("/ollama/generate", get(chat::generate_handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
