//! Prometheus metrics collection for the relay
//!
//! Tracks chat outcomes and provider latency. Exposed via `/metrics` in
//! Prometheus text format.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Outcome of a relay request, used as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ValidationError,
    ProviderError,
}

impl Outcome {
    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::ValidationError => "validation_error",
            Outcome::ProviderError => "provider_error",
        }
    }
}

/// Endpoint a request arrived on, used as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Chat,
    Generate,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Chat => "chat",
            Route::Generate => "generate",
        }
    }
}

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    provider_duration: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 2 routes × 3 outcomes
        let requests_total = IntCounterVec::new(
            Opts::new(
                "ollama_relay_chat_requests_total",
                "Total relay requests by route and outcome",
            ),
            &["route", "outcome"],
        )?;

        // Local models are slow to load; buckets reach two minutes
        let provider_duration = HistogramVec::new(
            HistogramOpts::new(
                "ollama_relay_provider_duration_seconds",
                "Completion provider call latency in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["outcome"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(provider_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            provider_duration,
        })
    }

    /// Count one finished request
    pub fn record_request(&self, route: Route, outcome: Outcome) -> Result<(), prometheus::Error> {
        self.requests_total
            .get_metric_with_label_values(&[route.as_str(), outcome.as_str()])?
            .inc();
        Ok(())
    }

    /// Record how long the provider call took
    ///
    /// # Errors
    ///
    /// Rejects NaN, infinite and negative durations.
    pub fn record_provider_duration(
        &self,
        outcome: Outcome,
        seconds: f64,
    ) -> Result<(), prometheus::Error> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "invalid provider duration: {} (must be finite and non-negative)",
                seconds
            )));
        }
        self.provider_duration
            .get_metric_with_label_values(&[outcome.as_str()])?
            .observe(seconds);
        Ok(())
    }

    /// Current value of the request counter for a label pair
    pub fn request_count(&self, route: Route, outcome: Outcome) -> u64 {
        self.requests_total
            .get_metric_with_label_values(&[route.as_str(), outcome.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("metrics output is not valid UTF-8: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new_registers() {
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_record_request_increments_counter() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request(Route::Chat, Outcome::Success).unwrap();
        metrics.record_request(Route::Chat, Outcome::Success).unwrap();
        metrics
            .record_request(Route::Chat, Outcome::ValidationError)
            .unwrap();

        assert_eq!(metrics.request_count(Route::Chat, Outcome::Success), 2);
        assert_eq!(
            metrics.request_count(Route::Chat, Outcome::ValidationError),
            1
        );
        assert_eq!(metrics.request_count(Route::Generate, Outcome::Success), 0);
    }

    #[test]
    fn test_record_provider_duration_rejects_invalid_values() {
        let metrics = Metrics::new().unwrap();
        assert!(
            metrics
                .record_provider_duration(Outcome::Success, f64::NAN)
                .is_err()
        );
        assert!(
            metrics
                .record_provider_duration(Outcome::Success, -1.0)
                .is_err()
        );
        assert!(
            metrics
                .record_provider_duration(Outcome::Success, f64::INFINITY)
                .is_err()
        );
        assert!(
            metrics
                .record_provider_duration(Outcome::Success, 0.42)
                .is_ok()
        );
    }

    #[test]
    fn test_gather_contains_metric_names() {
        let metrics = Metrics::new().unwrap();
        metrics
            .record_request(Route::Generate, Outcome::ProviderError)
            .unwrap();
        metrics
            .record_provider_duration(Outcome::ProviderError, 1.5)
            .unwrap();

        let output = metrics.gather().unwrap();
        assert!(output.contains("ollama_relay_chat_requests_total"));
        assert!(output.contains(r#"outcome="provider_error""#));
        assert!(output.contains("ollama_relay_provider_duration_seconds"));
    }
}
