//! Consultation orchestrator.
//!
//! Composes rate limiting, model selection, response caching and
//! conversation history around one upstream call per model.

use std::sync::Arc;

use consult_core::{
    config::AppConfig,
    traits::UpstreamClient,
    types::{
        ChatMessage, ConsultationRequest, ConsultationResult, ModelDescriptor, ModelSummary,
        TokenUsage,
    },
    Result,
};
use consult_model_gateway::KeywordModelSelector;
use consult_telemetry::{track_consultation, track_rate_limited, track_tokens};

use crate::history::ConversationHistory;
use crate::rate_limit::RateLimiter;
use crate::response_cache::ResponseCache;

/// Rate-limit bucket shared by every stateless caller.
pub const GLOBAL_RATE_LIMIT_ID: &str = "global";

/// Outcome of one model inside a multi-model batch.
struct BatchEntry {
    model: ModelDescriptor,
    outcome: Result<ConsultationResult>,
}

/// Per-request pipeline around the upstream client.
///
/// All shared state lives behind `Arc`s, so one orchestrator serves any
/// number of concurrent requests.
pub struct ConsultationOrchestrator {
    selector: Arc<KeywordModelSelector>,
    upstream: Arc<dyn UpstreamClient>,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    history: Arc<ConversationHistory>,
}

impl ConsultationOrchestrator {
    /// Build an orchestrator with components sized from `config`.
    pub fn new(config: &AppConfig, upstream: Arc<dyn UpstreamClient>) -> Self {
        Self {
            selector: Arc::new(KeywordModelSelector::new()),
            upstream,
            rate_limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
            cache: Arc::new(ResponseCache::from_config(&config.cache)),
            history: Arc::new(ConversationHistory::from_config(&config.history)),
        }
    }

    pub fn selector(&self) -> &Arc<KeywordModelSelector> {
        &self.selector
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn history(&self) -> &Arc<ConversationHistory> {
        &self.history
    }

    /// Every catalog model, sorted by short id.
    pub fn list_models(&self) -> Vec<ModelSummary> {
        self.selector
            .all_models()
            .values()
            .map(ModelSummary::from)
            .collect()
    }

    /// Run one consultation request.
    pub async fn consult(&self, request: ConsultationRequest) -> Result<ConsultationResult> {
        request.validate()?;

        let identifier = request
            .conversation_id
            .as_deref()
            .unwrap_or(GLOBAL_RATE_LIMIT_ID);
        self.rate_limiter
            .check(identifier)
            .inspect_err(|_| track_rate_limited())?;

        if request.clear_history {
            if let Some(conversation_id) = &request.conversation_id {
                self.history.clear(conversation_id);
            }
        }

        match &request.models {
            Some(models) => self.consult_many(&request, models).await,
            None => self.consult_single(&request).await,
        }
    }

    async fn consult_single(&self, request: &ConsultationRequest) -> Result<ConsultationResult> {
        let model = self.resolve_model(request.model.as_deref(), request);
        let history = self.load_history(request);

        tracing::info!(
            model = model.id,
            conversation_id = ?request.conversation_id,
            history_len = history.len(),
            "Processing consultation"
        );

        let result = self.consult_model(request, &model, &history).await?;

        if let Some(conversation_id) = &request.conversation_id {
            self.history
                .update(conversation_id, request.prompt.as_str(), result.response.as_str());
        }

        Ok(result)
    }

    /// Consult each model in order, isolating failures per model.
    async fn consult_many(
        &self,
        request: &ConsultationRequest,
        model_ids: &[String],
    ) -> Result<ConsultationResult> {
        let history = self.load_history(request);

        tracing::info!(
            models = model_ids.len(),
            conversation_id = ?request.conversation_id,
            "Processing multi-model consultation"
        );

        let mut entries = Vec::with_capacity(model_ids.len());
        for model_id in model_ids {
            let model = self.resolve_model(Some(model_id), request);
            let outcome = self.consult_model(request, &model, &history).await;
            if let Err(e) = &outcome {
                tracing::warn!(model = model.id, error = %e, "Model failed in multi-model batch");
            }
            entries.push(BatchEntry { model, outcome });
        }

        let usage = entries
            .iter()
            .filter_map(|entry| entry.outcome.as_ref().ok())
            .fold(TokenUsage::default(), |total, result| total.add(&result.usage));
        let cached = entries
            .iter()
            .all(|entry| matches!(&entry.outcome, Ok(result) if result.cached));
        let model = entries
            .iter()
            .map(|entry| entry.model.id)
            .collect::<Vec<_>>()
            .join(", ");
        let response = render_batch(&entries);

        if let Some(conversation_id) = &request.conversation_id {
            self.history
                .update(conversation_id, request.prompt.as_str(), response.as_str());
        }

        Ok(ConsultationResult {
            model,
            response,
            usage,
            cached,
        })
    }

    /// Explicit id if it is known, otherwise keyword auto-selection.
    fn resolve_model(&self, explicit: Option<&str>, request: &ConsultationRequest) -> ModelDescriptor {
        if let Some(id) = explicit {
            match self.selector.resolve(id) {
                Ok(model) => return *model,
                Err(e) => {
                    tracing::warn!(requested = id, error = %e, "Unknown model, falling back to auto-selection");
                }
            }
        }
        *self.selector.select_model(request.selection_text())
    }

    fn load_history(&self, request: &ConsultationRequest) -> Vec<ChatMessage> {
        match &request.conversation_id {
            Some(conversation_id) => self.history.get(conversation_id),
            None => Vec::new(),
        }
    }

    /// Cache lookup, upstream call and cache fill for one resolved model.
    async fn consult_model(
        &self,
        request: &ConsultationRequest,
        model: &ModelDescriptor,
        history: &[ChatMessage],
    ) -> Result<ConsultationResult> {
        let cache_key = request
            .is_stateless()
            .then(|| ResponseCache::generate_cache_key(model.provider_id, &request.prompt));

        if let Some(key) = &cache_key {
            if let Some(hit) = self.cache.get(key) {
                tracing::debug!(model = model.id, "Cache hit");
                track_consultation(model.id, true);
                let mut result = ConsultationResult::clone(&hit);
                result.model = format!("{} (cached)", model.id);
                result.cached = true;
                return Ok(result);
            }
        }

        let result = self
            .upstream
            .consult(&request.prompt, model, history)
            .await?;
        track_consultation(model.id, false);
        track_tokens(model.id, &result.usage);

        if let Some(key) = cache_key {
            self.cache.set(key, result.clone());
        }

        Ok(result)
    }
}

/// Combined markdown document for a multi-model batch.
fn render_batch(entries: &[BatchEntry]) -> String {
    let sections = entries
        .iter()
        .map(|entry| match &entry.outcome {
            Ok(result) => format!("## {}\n\n{}", result.model, result.response),
            Err(e) => format!("## {} (error)\n\nError: {}", entry.model.id, e),
        })
        .collect::<Vec<_>>();

    format!(
        "# Multi-model consultation ({} models)\n\n{}",
        entries.len(),
        sections.join("\n\n---\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use consult_core::Error;
    use consult_model_gateway::MockUpstreamClient;

    fn orchestrator(mock: MockUpstreamClient) -> (ConsultationOrchestrator, Arc<MockUpstreamClient>) {
        let mock = Arc::new(mock);
        let orchestrator = ConsultationOrchestrator::new(&AppConfig::default(), mock.clone());
        (orchestrator, mock)
    }

    #[tokio::test]
    async fn test_blank_prompt_rejected_before_rate_limit() {
        let (orch, mock) = orchestrator(MockUpstreamClient::new("ok"));
        let err = orch.consult(ConsultationRequest::new("   ")).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(orch.rate_limiter().remaining(GLOBAL_RATE_LIMIT_ID), 20);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_model_falls_back_to_selection() {
        let (orch, mock) = orchestrator(MockUpstreamClient::new("ok"));
        let request = ConsultationRequest::new("refactor this function").with_model("gpt-99");

        let result = orch.consult(request).await.unwrap();
        assert_eq!(result.model, "gpt-5-codex");
        assert_eq!(mock.calls()[0].model, "gpt-5-codex");
    }

    #[tokio::test]
    async fn test_explicit_model_wins_over_keywords() {
        let (orch, _mock) = orchestrator(MockUpstreamClient::new("ok"));
        let request = ConsultationRequest::new("refactor this function").with_model("deepseek-v3.1");

        let result = orch.consult(request).await.unwrap();
        assert_eq!(result.model, "deepseek-v3.1");
    }

    #[tokio::test]
    async fn test_task_description_drives_selection() {
        let (orch, _mock) = orchestrator(MockUpstreamClient::new("ok"));
        let request = ConsultationRequest::new("hello there").with_task("keep it on a budget");

        let result = orch.consult(request).await.unwrap();
        assert_eq!(result.model, "deepseek-v3.1");
    }

    #[tokio::test]
    async fn test_conversation_bypasses_cache_and_records_history() {
        let (orch, mock) = orchestrator(MockUpstreamClient::new("ok"));

        for _ in 0..2 {
            let request = ConsultationRequest::new("explain recursion").with_conversation("c1");
            let result = orch.consult(request).await.unwrap();
            assert!(!result.cached);
        }

        assert_eq!(mock.call_count(), 2);
        assert!(orch.cache().is_empty());
        assert_eq!(orch.history().get("c1").len(), 4);

        let calls = mock.calls();
        assert!(calls[0].history.is_empty());
        assert_eq!(calls[1].history[0], ChatMessage::user("explain recursion"));
    }

    #[tokio::test]
    async fn test_clear_history_runs_before_consulting() {
        let (orch, mock) = orchestrator(MockUpstreamClient::new("ok"));
        orch.consult(ConsultationRequest::new("first").with_conversation("c1"))
            .await
            .unwrap();

        let request = ConsultationRequest::new("second")
            .with_conversation("c1")
            .clearing_history();
        orch.consult(request).await.unwrap();

        assert!(mock.calls()[1].history.is_empty());
        assert_eq!(orch.history().get("c1").len(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates_and_is_not_cached() {
        let (orch, _mock) = orchestrator(MockUpstreamClient::new("ok").failing_for("gpt-5-mini"));

        let err = orch
            .consult(ConsultationRequest::new("explain recursion"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream { status: Some(500), .. }));
        assert!(orch.cache().is_empty());
    }

    #[tokio::test]
    async fn test_multi_model_records_one_history_turn() {
        let (orch, mock) = orchestrator(MockUpstreamClient::new("ok"));
        let request = ConsultationRequest::new("compare these")
            .with_models(["gpt-5-mini", "gemini-2.5-pro"])
            .with_conversation("c1");

        let result = orch.consult(request).await.unwrap();

        assert_eq!(result.model, "gpt-5-mini, gemini-2.5-pro");
        assert!(result.response.starts_with("# Multi-model consultation (2 models)"));
        assert_eq!(result.usage, TokenUsage::new(20, 40, 60));
        assert_eq!(mock.call_count(), 2);

        let history = orch.history().get("c1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, result.response);
        assert_eq!(orch.rate_limiter().remaining("c1"), 19);
    }

    #[tokio::test]
    async fn test_multi_model_unknown_id_falls_back_to_selection() {
        let (orch, mock) = orchestrator(MockUpstreamClient::new("ok"));
        let request = ConsultationRequest::new("refactor this function")
            .with_models(["gpt-99", "gpt-5-mini"]);

        let result = orch.consult(request).await.unwrap();

        assert_eq!(result.model, "gpt-5-codex, gpt-5-mini");
        assert!(result.response.contains("## gpt-5-codex\n\n"));
        assert!(!result.response.contains("(error)"));
        let called: Vec<_> = mock.calls().into_iter().map(|call| call.model).collect();
        assert_eq!(called, vec!["gpt-5-codex", "gpt-5-mini"]);
    }

    #[tokio::test]
    async fn test_multi_model_cached_only_when_every_entry_hits() {
        let (orch, mock) = orchestrator(MockUpstreamClient::new("ok"));
        orch.consult(ConsultationRequest::new("hi").with_model("gpt-5-mini"))
            .await
            .unwrap();

        let partial = orch
            .consult(ConsultationRequest::new("hi").with_models(["gpt-5-mini", "gpt-5-codex"]))
            .await
            .unwrap();
        assert!(!partial.cached);
        assert!(partial.response.contains("## gpt-5-mini (cached)"));
        assert_eq!(mock.call_count(), 2);

        let full = orch
            .consult(ConsultationRequest::new("hi").with_models(["gpt-5-mini", "gpt-5-codex"]))
            .await
            .unwrap();
        assert!(full.cached);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_model_list_rejected() {
        let (orch, _mock) = orchestrator(MockUpstreamClient::new("ok"));
        let err = orch
            .consult(ConsultationRequest::new("hi").with_models(Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_list_models_sorted_by_name() {
        let (orch, _mock) = orchestrator(MockUpstreamClient::new("ok"));
        let models = orch.list_models();

        assert_eq!(models.len(), 6);
        let names: Vec<_> = models.iter().map(|m| m.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
