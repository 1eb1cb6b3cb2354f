use serde::{Deserialize, Serialize};

/// Token accounting reported by the provider. Any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn new(prompt: u64, completion: u64, total: u64) -> Self {
        Self {
            prompt_tokens: Some(prompt),
            completion_tokens: Some(completion),
            total_tokens: Some(total),
        }
    }

    /// Field-wise sum, missing fields counted as zero.
    pub fn add(&self, other: &TokenUsage) -> TokenUsage {
        fn sum(a: Option<u64>, b: Option<u64>) -> Option<u64> {
            Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0)))
        }
        TokenUsage {
            prompt_tokens: sum(self.prompt_tokens, other.prompt_tokens),
            completion_tokens: sum(self.completion_tokens, other.completion_tokens),
            total_tokens: sum(self.total_tokens, other.total_tokens),
        }
    }
}

/// Outcome of a consultation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationResult {
    /// Resolved model label.
    pub model: String,
    /// Response text.
    pub response: String,
    /// Token usage.
    pub usage: TokenUsage,
    /// Whether the result was served from cache.
    pub cached: bool,
}
