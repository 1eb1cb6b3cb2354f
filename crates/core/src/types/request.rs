use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// Request Types
// =============================================================================

/// A caller's consultation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsultationRequest {
    /// The question or instruction. Required, non-empty.
    pub prompt: String,

    /// Explicit short model id.
    #[serde(default)]
    pub model: Option<String>,

    /// Ordered short model ids. Takes precedence over `model`.
    #[serde(default)]
    pub models: Option<Vec<String>>,

    /// Hint for automatic model selection.
    #[serde(default, alias = "taskDescription")]
    pub task_description: Option<String>,

    /// Presence switches the request into conversational mode.
    #[serde(default, alias = "conversationId")]
    pub conversation_id: Option<String>,

    /// Clear the conversation's history before consulting.
    #[serde(default, alias = "clearHistory")]
    pub clear_history: bool,
}

impl ConsultationRequest {
    /// Create a stateless request for a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Pin a single model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Consult several models in order.
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    /// Attach a task description used for auto-selection.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task_description = Some(task.into());
        self
    }

    /// Make the request conversational.
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Request a history reset.
    pub fn clearing_history(mut self) -> Self {
        self.clear_history = true;
        self
    }

    /// Whether the request has no conversation id (cache-eligible).
    pub fn is_stateless(&self) -> bool {
        self.conversation_id.is_none()
    }

    /// Text used for automatic model selection.
    pub fn selection_text(&self) -> &str {
        self.task_description
            .as_deref()
            .filter(|task| !task.trim().is_empty())
            .unwrap_or(&self.prompt)
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::validation("prompt is required"));
        }
        if let Some(models) = &self.models {
            if models.is_empty() {
                return Err(Error::validation("models must contain at least one model id"));
            }
        }
        Ok(())
    }
}
