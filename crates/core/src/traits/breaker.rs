//! Circuit breaker observation.

use serde::Serialize;
use std::fmt;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Requests pass through; outcomes feed the rolling statistics.
    Closed,
    /// Requests fail fast without invoking the guarded action.
    Open,
    /// A single probe request is allowed through.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Outcome of a single `fire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
    Timeout,
    /// Short-circuited while OPEN or while a probe was in flight.
    Rejected,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure => "failure",
            CallOutcome::Timeout => "timeout",
            CallOutcome::Rejected => "rejected",
        }
    }
}

/// Observer notified by a circuit breaker.
///
/// Invoked synchronously after the breaker's internal lock is released;
/// implementations must return quickly.
pub trait BreakerListener: Send + Sync {
    /// Called on every state transition.
    fn on_transition(&self, breaker: &str, from: CircuitState, to: CircuitState);

    /// Called once per `fire`.
    fn on_outcome(&self, _breaker: &str, _outcome: CallOutcome) {}
}
