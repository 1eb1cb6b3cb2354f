//! Axum-based HTTP server for the gateway.

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use consult_core::{
    config::ServerConfig,
    types::{ConsultationRequest, ConsultationResult, ModelSummary},
    Error, Result,
};

use crate::orchestrator::ConsultationOrchestrator;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Enable CORS.
    pub enable_cors: bool,
    /// Enable request tracing.
    pub enable_tracing: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for GatewayConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            enable_cors: true,
            enable_tracing: true,
        }
    }
}

/// Gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    orchestrator: Arc<ConsultationOrchestrator>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: GatewayConfig, orchestrator: Arc<ConsultationOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            metrics_handle: None,
        }
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/v1/models", get(models_handler))
            .route("/v1/consult", post(consult_handler))
            .with_state(self.orchestrator.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        if self.config.enable_cors {
            router = router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
        }

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::internal(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Consultation response.
#[derive(Debug, Serialize)]
pub struct ConsultResponse {
    /// Trace ID for this request.
    pub trace_id: String,
    #[serde(flatten)]
    pub result: ConsultationResult,
}

/// Model listing response.
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelSummary>,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Trace ID.
    pub trace_id: Option<String>,
}

/// Engine error rendered as an HTTP response.
struct ApiError {
    error: Error,
    trace_id: Option<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.error {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            code: self.error.code().to_string(),
            message: self.error.to_string(),
            trace_id: self.trace_id,
        });

        let mut response = (status, body).into_response();
        if let Error::RateLimited { retry_after_secs } = self.error {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Model catalog handler.
async fn models_handler(State(orchestrator): State<Arc<ConsultationOrchestrator>>) -> impl IntoResponse {
    Json(ModelsResponse {
        models: orchestrator.list_models(),
    })
}

/// Consultation handler.
async fn consult_handler(
    State(orchestrator): State<Arc<ConsultationOrchestrator>>,
    payload: std::result::Result<Json<ConsultationRequest>, JsonRejection>,
) -> std::result::Result<Json<ConsultResponse>, ApiError> {
    let trace_id = Uuid::new_v4().to_string();

    let Json(request) = payload.map_err(|rejection| ApiError {
        error: Error::validation(rejection.body_text()),
        trace_id: Some(trace_id.clone()),
    })?;

    tracing::info!(
        trace_id = %trace_id,
        prompt_len = request.prompt.len(),
        conversation_id = ?request.conversation_id,
        "Processing consult request"
    );

    match orchestrator.consult(request).await {
        Ok(result) => {
            tracing::info!(
                trace_id = %trace_id,
                model = %result.model,
                cached = result.cached,
                "Consultation completed"
            );
            Ok(Json(ConsultResponse { trace_id, result }))
        }
        Err(error) => {
            tracing::warn!(trace_id = %trace_id, error = %error, "Consultation failed");
            Err(ApiError {
                error,
                trace_id: Some(trace_id),
            })
        }
    }
}
