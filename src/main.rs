#![deny(unused)]
//! llm-consult - LLM consultation gateway
//!
//! Routes natural-language requests to upstream language models behind rate
//! limiting, response caching, bounded conversation history and a circuit
//! breaker with retry.

use std::sync::Arc;

use consult_core::config::AppConfig;
use consult_gateway::{ConsultationOrchestrator, GatewayConfig, GatewayServer};
use consult_model_gateway::create_client_from_config;
use consult_telemetry::{configure_tracing, setup_metrics_recorder, MetricsListener};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // Initialize tracing
    configure_tracing(config.logging.json)?;

    tracing::info!("Starting llm-consult v{}", env!("CARGO_PKG_VERSION"));

    let metrics_handle = setup_metrics_recorder()?;

    // =========================================================================
    // Upstream client (circuit breaker + retry)
    // =========================================================================
    let upstream = create_client_from_config(&config, vec![Arc::new(MetricsListener)]);
    tracing::info!(
        endpoint = %config.upstream.endpoint,
        call_timeout_ms = config.circuit_breaker.call_timeout_ms,
        retry_attempts = config.retry.attempts,
        "Upstream client initialized"
    );

    // =========================================================================
    // Orchestrator
    // =========================================================================
    let orchestrator = Arc::new(ConsultationOrchestrator::new(&config, Arc::new(upstream)));
    let _sweeper = orchestrator
        .cache()
        .spawn_sweeper(config.cache.sweep_interval());

    tracing::info!(
        requests_per_minute = config.rate_limit.requests_per_minute,
        cache_ttl_secs = config.cache.ttl_secs,
        max_history = config.history.max_messages,
        "Orchestrator initialized"
    );

    let gateway_config = GatewayConfig::from(&config.server);

    // Print startup banner
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                     llm-consult v{}                       ║", env!("CARGO_PKG_VERSION"));
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Endpoints:                                                   ║");
    println!("║    GET  /health      - Health check                          ║");
    println!("║    GET  /v1/models   - List available models                 ║");
    println!("║    POST /v1/consult  - Consult one or more models            ║");
    println!("║    GET  /metrics     - Prometheus metrics                    ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Server: http://{}:{}                              ║", gateway_config.host, gateway_config.port);
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    GatewayServer::new(gateway_config, orchestrator)
        .with_metrics(metrics_handle)
        .run()
        .await?;

    Ok(())
}
