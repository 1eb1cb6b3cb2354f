//! Three-state circuit breaker guarding the upstream call.
//!
//! CLOSED counts outcomes in a rolling window and opens once the failure
//! fraction exceeds the configured threshold. OPEN rejects every call until
//! the reset timeout elapses, then HALF_OPEN admits exactly one probe whose
//! outcome closes or re-opens the circuit. Every admitted call is bounded by
//! a hard timeout that counts as a failure.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tokio::time::Instant;

use consult_core::{
    config::CircuitBreakerConfig,
    traits::{BreakerListener, CallOutcome, CircuitState},
    Error, Result,
};

/// Snapshot of breaker statistics for the current rolling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerStats {
    pub state: CircuitState,
    pub fires: u32,
    pub failures: u32,
    pub error_rate: f64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    /// (completed at, succeeded)
    window: VecDeque<(Instant, bool)>,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            opened_at: None,
            probe_in_flight: false,
            window: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: Instant, width: std::time::Duration) {
        while let Some((at, _)) = self.window.front() {
            if now.duration_since(*at) >= width {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn counts(&self) -> (u32, u32) {
        let fires = self.window.len() as u32;
        let failures = self.window.iter().filter(|(_, ok)| !ok).count() as u32;
        (fires, failures)
    }
}

type Transition = (CircuitState, CircuitState);

/// How a call was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe,
}

/// Resets the probe slot if a probe future is dropped before completing.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl ProbeGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.breaker.lock();
            if inner.state == CircuitState::HalfOpen {
                inner.probe_in_flight = false;
            }
        }
    }
}

/// Circuit breaker shared by every caller of one upstream client.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    listeners: RwLock<Vec<Arc<dyn BreakerListener>>>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Attach a listener (builder form).
    pub fn with_listener(self, listener: Arc<dyn BreakerListener>) -> Self {
        self.add_listener(listener);
        self
    }

    /// Attach a listener.
    pub fn add_listener(&self, listener: Arc<dyn BreakerListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state. An expired OPEN period is reported as HALF_OPEN.
    pub fn state(&self) -> CircuitState {
        let (state, transition) = {
            let mut inner = self.lock();
            let transition = self.refresh(&mut inner, Instant::now());
            (inner.state, transition)
        };
        self.notify_transition(transition);
        state
    }

    /// Statistics for the current rolling window.
    pub fn stats(&self) -> BreakerStats {
        let mut inner = self.lock();
        inner.prune(Instant::now(), self.config.rolling_window());
        let (fires, failures) = inner.counts();
        BreakerStats {
            state: inner.state,
            fires,
            failures,
            error_rate: if fires == 0 {
                0.0
            } else {
                failures as f64 / fires as f64
            },
        }
    }

    /// Run `action` through the breaker.
    ///
    /// Fails with `CircuitOpen` without invoking `action` while OPEN, or while
    /// HALF_OPEN with a probe already in flight.
    pub async fn fire<F, Fut, T>(&self, action: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let admission = match self.admit() {
            Ok(admission) => admission,
            Err(e) => {
                self.notify_outcome(CallOutcome::Rejected);
                return Err(e);
            }
        };

        let mut guard = ProbeGuard {
            breaker: self,
            armed: admission == Admission::Probe,
        };

        let timeout = self.config.call_timeout();
        let result = match tokio::time::timeout(timeout, action()).await {
            Ok(Ok(value)) => {
                self.record(admission, CallOutcome::Success);
                Ok(value)
            }
            Ok(Err(e)) => {
                self.record(admission, CallOutcome::Failure);
                Err(e)
            }
            Err(_) => {
                self.record(admission, CallOutcome::Timeout);
                Err(Error::upstream(format!(
                    "upstream call timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        };
        guard.disarm();
        result
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move OPEN to HALF_OPEN once the reset timeout has elapsed.
    fn refresh(&self, inner: &mut BreakerInner, now: Instant) -> Option<Transition> {
        if inner.state != CircuitState::Open {
            return None;
        }
        let opened_at = inner.opened_at?;
        if now.duration_since(opened_at) < self.config.reset_timeout() {
            return None;
        }
        inner.state = CircuitState::HalfOpen;
        inner.probe_in_flight = false;
        Some((CircuitState::Open, CircuitState::HalfOpen))
    }

    fn admit(&self) -> Result<Admission> {
        let (admission, transition) = {
            let mut inner = self.lock();
            let transition = self.refresh(&mut inner, Instant::now());

            let admission = match inner.state {
                CircuitState::Closed => Ok(Admission::Normal),
                CircuitState::HalfOpen if !inner.probe_in_flight => {
                    inner.probe_in_flight = true;
                    Ok(Admission::Probe)
                }
                CircuitState::HalfOpen => Err(Error::CircuitOpen(format!(
                    "{} is half-open with a probe in flight",
                    self.name
                ))),
                CircuitState::Open => Err(Error::CircuitOpen(format!(
                    "{} is unavailable, failing fast",
                    self.name
                ))),
            };
            (admission, transition)
        };

        self.notify_transition(transition);
        admission
    }

    fn record(&self, admission: Admission, outcome: CallOutcome) {
        let succeeded = outcome == CallOutcome::Success;
        let now = Instant::now();

        let transition = {
            let mut inner = self.lock();
            inner.prune(now, self.config.rolling_window());
            inner.window.push_back((now, succeeded));

            match (admission, inner.state) {
                (Admission::Probe, CircuitState::HalfOpen) => {
                    inner.probe_in_flight = false;
                    if succeeded {
                        inner.state = CircuitState::Closed;
                        inner.opened_at = None;
                        inner.window.clear();
                        Some((CircuitState::HalfOpen, CircuitState::Closed))
                    } else {
                        inner.state = CircuitState::Open;
                        inner.opened_at = Some(now);
                        Some((CircuitState::HalfOpen, CircuitState::Open))
                    }
                }
                (Admission::Normal, CircuitState::Closed) if !succeeded => {
                    let (fires, failures) = inner.counts();
                    let error_rate = failures as f64 / fires as f64;
                    if fires >= self.config.volume_threshold
                        && error_rate > self.config.error_threshold
                    {
                        inner.state = CircuitState::Open;
                        inner.opened_at = Some(now);
                        tracing::debug!(
                            breaker = %self.name,
                            fires,
                            failures,
                            error_rate,
                            "Error threshold crossed"
                        );
                        Some((CircuitState::Closed, CircuitState::Open))
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };

        self.notify_transition(transition);
        self.notify_outcome(outcome);
    }

    fn listeners(&self) -> Vec<Arc<dyn BreakerListener>> {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn notify_transition(&self, transition: Option<Transition>) {
        if let Some((from, to)) = transition {
            for listener in self.listeners() {
                listener.on_transition(&self.name, from, to);
            }
        }
    }

    fn notify_outcome(&self, outcome: CallOutcome) {
        for listener in self.listeners() {
            listener.on_outcome(&self.name, outcome);
        }
    }
}

/// Listener that logs breaker transitions.
pub struct LoggingListener;

impl BreakerListener for LoggingListener {
    fn on_transition(&self, breaker: &str, from: CircuitState, to: CircuitState) {
        match to {
            CircuitState::Open => {
                tracing::warn!(breaker = breaker, from = %from, "Circuit breaker OPENED")
            }
            CircuitState::HalfOpen => {
                tracing::info!(breaker = breaker, "Circuit breaker HALF_OPEN, probing upstream")
            }
            CircuitState::Closed => {
                tracing::info!(breaker = breaker, from = %from, "Circuit breaker CLOSED")
            }
        }
    }
}
