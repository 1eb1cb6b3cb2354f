#![deny(unused)]
//! Telemetry for the consultation engine.
//!
//! This crate provides:
//! - Structured logging setup
//! - Prometheus metrics and helpers
//! - A circuit breaker listener that records transitions as metrics

pub mod metrics;
pub mod tracing_layer;

pub use crate::metrics::{
    setup_metrics_recorder, track_consultation, track_rate_limited, track_tokens, MetricsListener,
};
pub use crate::tracing_layer::configure_tracing;
