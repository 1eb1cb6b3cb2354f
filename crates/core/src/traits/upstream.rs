//! Upstream provider traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatMessage, ConsultationResult, ModelDescriptor};

/// Client for a single consultation with the model provider.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Send `history` followed by `prompt` as a new user turn to `model`.
    ///
    /// The returned result is never marked as cached.
    async fn consult(
        &self,
        prompt: &str,
        model: &ModelDescriptor,
        history: &[ChatMessage],
    ) -> Result<ConsultationResult>;
}
