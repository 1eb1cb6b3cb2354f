//! Metrics implementation using Prometheus.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use consult_core::{
    traits::{BreakerListener, CallOutcome, CircuitState},
    types::TokenUsage,
    Error, Result,
};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Count a completed consultation.
pub fn track_consultation(model: &str, cached: bool) {
    metrics::counter!(
        "consultations_total",
        "model" => model.to_string(),
        "cached" => cached.to_string()
    )
    .increment(1);
}

/// Helper to track token usage. Missing fields count as zero.
pub fn track_tokens(model: &str, usage: &TokenUsage) {
    metrics::counter!("llm_token_usage_total", "model" => model.to_string(), "type" => "prompt")
        .increment(usage.prompt_tokens.unwrap_or(0));
    metrics::counter!("llm_token_usage_total", "model" => model.to_string(), "type" => "completion")
        .increment(usage.completion_tokens.unwrap_or(0));
}

/// Count a request rejected by the rate limiter.
pub fn track_rate_limited() {
    metrics::counter!("rate_limited_total").increment(1);
}

/// Breaker listener that exports transitions and call outcomes.
pub struct MetricsListener;

impl BreakerListener for MetricsListener {
    fn on_transition(&self, breaker: &str, _from: CircuitState, to: CircuitState) {
        metrics::counter!(
            "circuit_breaker_transitions_total",
            "breaker" => breaker.to_string(),
            "to" => to.as_str()
        )
        .increment(1);
    }

    fn on_outcome(&self, breaker: &str, outcome: CallOutcome) {
        metrics::counter!(
            "circuit_breaker_calls_total",
            "breaker" => breaker.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }
}
