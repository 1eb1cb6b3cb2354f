//! End-to-end orchestrator scenarios against the mock upstream.

use std::sync::Arc;

use consult_core::{
    config::AppConfig,
    types::{ConsultationRequest, TokenUsage},
    Error,
};
use consult_gateway::{ConsultationOrchestrator, ResponseCache};
use consult_model_gateway::MockUpstreamClient;

fn setup(mock: MockUpstreamClient) -> (ConsultationOrchestrator, Arc<MockUpstreamClient>) {
    let mock = Arc::new(mock);
    let orchestrator = ConsultationOrchestrator::new(&AppConfig::default(), mock.clone());
    (orchestrator, mock)
}

#[tokio::test]
async fn test_stateless_request_is_cached_then_served_from_cache() {
    let (orchestrator, mock) = setup(MockUpstreamClient::new("Recursion is"));

    // First call goes upstream with the quick-question model.
    let first = orchestrator
        .consult(ConsultationRequest::new("explain recursion"))
        .await
        .unwrap();

    assert_eq!(first.model, "gpt-5-mini");
    assert!(!first.cached);
    assert_eq!(mock.call_count(), 1);
    assert!(orchestrator.cache().has(&ResponseCache::generate_cache_key(
        "openai/gpt-5-mini",
        "explain recursion"
    )));

    // Identical request is a cache hit.
    let second = orchestrator
        .consult(ConsultationRequest::new("explain recursion"))
        .await
        .unwrap();

    assert!(second.cached);
    assert_eq!(second.model, "gpt-5-mini (cached)");
    assert_eq!(second.response, first.response);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_multi_model_isolates_failures() {
    let usage = TokenUsage::new(7, 11, 18);
    let (orchestrator, mock) = setup(
        MockUpstreamClient::new("Answer")
            .with_usage(usage)
            .failing_for("grok-code-fast-1"),
    );

    let request = ConsultationRequest::new("review this code")
        .with_models(["gpt-5-codex", "grok-code-fast-1"]);
    let result = orchestrator.consult(request).await.unwrap();

    assert_eq!(mock.call_count(), 2);
    assert_eq!(result.model, "gpt-5-codex, grok-code-fast-1");
    assert!(!result.cached);
    assert!(result.response.contains("## gpt-5-codex\n\nAnswer [gpt-5-codex]: review this code"));
    assert!(result.response.contains("## grok-code-fast-1 (error)"));
    assert!(result.response.contains("Error: "));
    assert_eq!(result.response.matches("\n---\n").count(), 1);
    assert_eq!(result.usage, usage);
}

#[tokio::test]
async fn test_conversation_rate_limit_ceiling() {
    tokio::time::pause();
    let (orchestrator, mock) = setup(MockUpstreamClient::new("ok"));

    for i in 0..20 {
        let request = ConsultationRequest::new(format!("question {}", i)).with_conversation("conv-d");
        orchestrator.consult(request).await.unwrap();
    }

    let err = orchestrator
        .consult(ConsultationRequest::new("one more").with_conversation("conv-d"))
        .await
        .unwrap_err();

    match err {
        Error::RateLimited { retry_after_secs } => {
            assert!(retry_after_secs > 0 && retry_after_secs <= 60);
        }
        other => panic!("Expected RateLimited, got {:?}", other),
    }
    assert_eq!(mock.call_count(), 20);

    // Other conversations are unaffected.
    orchestrator
        .consult(ConsultationRequest::new("hello").with_conversation("conv-other"))
        .await
        .unwrap();

    // The window resets after a minute.
    tokio::time::advance(std::time::Duration::from_secs(60)).await;
    orchestrator
        .consult(ConsultationRequest::new("again").with_conversation("conv-d"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_history_stays_bounded_across_requests() {
    let mut config = AppConfig::default();
    config.history.max_messages = 4;
    let mock = Arc::new(MockUpstreamClient::new("ok"));
    let orchestrator = ConsultationOrchestrator::new(&config, mock.clone());

    for i in 0..5 {
        let request = ConsultationRequest::new(format!("q{}", i)).with_conversation("c");
        orchestrator.consult(request).await.unwrap();
    }

    let history = orchestrator.history().get("c");
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].content, "q3");

    // The last upstream call saw the trimmed history.
    let calls = mock.calls();
    assert_eq!(calls[4].history.len(), 4);
    assert_eq!(calls[4].history[0].content, "q2");
}

#[tokio::test]
async fn test_circuit_open_propagates_from_single_model() {
    let (orchestrator, mock) = setup(
        MockUpstreamClient::new("ok")
            .failing_with("gpt-5-mini", || Error::CircuitOpen("upstream".to_string())),
    );

    let err = orchestrator
        .consult(ConsultationRequest::new("hi").with_model("gpt-5-mini").with_conversation("c"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CircuitOpen(ref name) if name == "upstream"));
    assert_eq!(mock.call_count(), 1);
    assert!(orchestrator.history().get("c").is_empty());
    assert!(orchestrator.cache().is_empty());
}

#[tokio::test]
async fn test_circuit_open_becomes_error_section_in_batch() {
    let (orchestrator, mock) = setup(
        MockUpstreamClient::new("Answer")
            .failing_with("gemini-2.5-pro", || Error::CircuitOpen("upstream".to_string())),
    );

    let result = orchestrator
        .consult(ConsultationRequest::new("hi").with_models(["gemini-2.5-pro", "gpt-5-mini"]))
        .await
        .unwrap();

    assert_eq!(mock.call_count(), 2);
    assert!(result.response.contains("## gemini-2.5-pro (error)"));
    assert!(result.response.contains("Circuit breaker open: upstream"));
    assert!(result.response.contains("## gpt-5-mini\n\nAnswer [gpt-5-mini]: hi"));
    assert_eq!(result.usage, TokenUsage::new(10, 20, 30));
}
