//! Mock upstream client for testing without real API calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use consult_core::{
    traits::UpstreamClient,
    types::{ChatMessage, ConsultationResult, ModelDescriptor, TokenUsage},
    Error, Result,
};

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
    pub history: Vec<ChatMessage>,
}

type ErrorFactory = Box<dyn Fn() -> Error + Send + Sync>;

/// Mock upstream client.
///
/// Answers `"<response> [<model>]: <prompt>"` with fixed usage, and fails
/// for any model registered through [`MockUpstreamClient::failing_for`] or
/// [`MockUpstreamClient::failing_with`].
pub struct MockUpstreamClient {
    response: String,
    usage: TokenUsage,
    failing_models: HashMap<String, ErrorFactory>,
    calls: AtomicUsize,
    recorded: Mutex<Vec<RecordedCall>>,
}

impl MockUpstreamClient {
    /// Create a new mock client.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            usage: TokenUsage::new(10, 20, 30),
            failing_models: HashMap::new(),
            calls: AtomicUsize::new(0),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call for the given short model id with a 500.
    pub fn failing_for(self, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        let message = format!("mock failure for {}", model_id);
        self.failing_with(model_id, move || Error::upstream_status(message.clone(), 500))
    }

    /// Fail every call for the given short model id with the error `make` builds.
    pub fn failing_with<F>(mut self, model_id: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> Error + Send + Sync + 'static,
    {
        self.failing_models.insert(model_id.into(), Box::new(make));
        self
    }

    /// Report this usage on every successful call.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Number of upstream calls made so far, failures included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl UpstreamClient for MockUpstreamClient {
    async fn consult(
        &self,
        prompt: &str,
        model: &ModelDescriptor,
        history: &[ChatMessage],
    ) -> Result<ConsultationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedCall {
                model: model.id.to_string(),
                prompt: prompt.to_string(),
                history: history.to_vec(),
            });

        if let Some(make) = self.failing_models.get(model.id) {
            return Err(make());
        }

        Ok(ConsultationResult {
            model: model.id.to_string(),
            response: format!("{} [{}]: {}", self.response, model.id, prompt),
            usage: self.usage,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MODELS;

    #[tokio::test]
    async fn test_mock_client() {
        let client = MockUpstreamClient::new("Response");

        let result = client.consult("Hello", &MODELS[0], &[]).await.unwrap();
        assert!(result.response.contains("Response"));
        assert!(result.response.contains("Hello"));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_client_failure() {
        let client = MockUpstreamClient::new("Response").failing_for(MODELS[0].id);

        let result = client.consult("Hello", &MODELS[0], &[]).await;
        assert!(matches!(result, Err(Error::Upstream { status: Some(500), .. })));
        assert_eq!(client.calls()[0].prompt, "Hello");
    }

    #[tokio::test]
    async fn test_mock_client_custom_error() {
        let client = MockUpstreamClient::new("Response")
            .failing_with(MODELS[0].id, || Error::CircuitOpen("upstream".to_string()));

        let result = client.consult("Hello", &MODELS[0], &[]).await;
        assert!(matches!(result, Err(Error::CircuitOpen(_))));
        assert!(client.consult("Hello", &MODELS[1], &[]).await.is_ok());
    }
}
