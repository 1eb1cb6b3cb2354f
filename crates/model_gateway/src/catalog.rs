//! Fixed catalog of consultable models.

use consult_core::types::ModelDescriptor;

/// Short id of the model used when no keyword set matches.
pub const DEFAULT_MODEL_ID: &str = "claude-sonnet-4.5";

/// Every model the engine can route to.
pub static MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "gpt-5-codex",
        provider_id: "openai/gpt-5-codex",
        description: "OpenAI GPT-5 tuned for agentic software engineering",
        best_for: &["coding", "refactoring", "debugging", "code review"],
    },
    ModelDescriptor {
        id: "grok-code-fast-1",
        provider_id: "x-ai/grok-code-fast-1",
        description: "xAI low-latency coding model",
        best_for: &["quick code edits", "fast iteration"],
    },
    ModelDescriptor {
        id: "gemini-2.5-pro",
        provider_id: "google/gemini-2.5-pro",
        description: "Google long-context reasoning model",
        best_for: &["complex analysis", "architecture", "research"],
    },
    ModelDescriptor {
        id: "gpt-5-mini",
        provider_id: "openai/gpt-5-mini",
        description: "Small, fast general model",
        best_for: &["quick questions", "explanations", "summaries"],
    },
    ModelDescriptor {
        id: "deepseek-v3.1",
        provider_id: "deepseek/deepseek-chat-v3.1",
        description: "Low-cost open-weights chat model",
        best_for: &["budget", "bulk tasks"],
    },
    ModelDescriptor {
        id: DEFAULT_MODEL_ID,
        provider_id: "anthropic/claude-sonnet-4.5",
        description: "Anthropic general-purpose model",
        best_for: &["general", "writing", "reasoning"],
    },
];
