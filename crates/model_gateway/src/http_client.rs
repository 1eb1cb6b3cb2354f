//! HTTP upstream client.
//!
//! One POST of `{model, messages}` to a chat-completions endpoint with
//! bearer auth, retried for transient failures and guarded by a shared
//! circuit breaker.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use consult_core::{
    config::UpstreamConfig,
    traits::UpstreamClient,
    types::{ChatMessage, ConsultationResult, ModelDescriptor, TokenUsage},
    Error, Result,
};

use crate::circuit_breaker::CircuitBreaker;
use crate::retry::RetryPolicy;

/// Longest slice of an error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client guarded by a circuit breaker.
pub struct HttpUpstreamClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<Secret<String>>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
}

impl HttpUpstreamClient {
    /// Create a new client.
    pub fn new(config: &UpstreamConfig, breaker: Arc<CircuitBreaker>, retry: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            breaker,
            retry,
        }
    }

    /// The breaker shared by all calls through this client.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Outgoing message list: history followed by the new user turn.
    fn build_messages(prompt: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(prompt));
        messages
    }

    async fn send_once(
        &self,
        body: &ChatCompletionRequest<'_>,
        attempt: u32,
    ) -> Result<ChatCompletionResponse> {
        tracing::debug!(
            model = body.model,
            messages = body.messages.len(),
            attempt,
            "Calling upstream provider"
        );

        let mut request = self.http.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::upstream(format!("request to provider failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            // Keep the message on one line.
            let snippet = snippet.split_whitespace().collect::<Vec<_>>().join(" ");
            return Err(Error::upstream_status(
                format!("provider returned {}: {}", status, snippet),
                status.as_u16(),
            ));
        }

        response.json::<ChatCompletionResponse>().await.map_err(|e| {
            Error::upstream_status(
                format!("invalid provider response: {}", e),
                status.as_u16(),
            )
        })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn consult(
        &self,
        prompt: &str,
        model: &ModelDescriptor,
        history: &[ChatMessage],
    ) -> Result<ConsultationResult> {
        let messages = Self::build_messages(prompt, history);
        let body = ChatCompletionRequest {
            model: model.provider_id,
            messages: &messages,
        };

        let response = self
            .breaker
            .fire(|| self.retry.run(|attempt| self.send_once(&body, attempt)))
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::upstream_status("provider returned no choices", 200))?;

        Ok(ConsultationResult {
            model: model.id.to_string(),
            response: content,
            usage: response.usage.unwrap_or_default(),
            cached: false,
        })
    }
}
