//! Keyword-based model selector.

use std::collections::BTreeMap;

use consult_core::{types::ModelDescriptor, Error, Result};

use crate::catalog::{DEFAULT_MODEL_ID, MODELS};

/// Keywords that suggest a coding task.
const CODING_KEYWORDS: &[&str] = &[
    "code",
    "coding",
    "function",
    "refactor",
    "debug",
    "bug",
    "implement",
    "compile",
    "syntax",
    "stack trace",
    "unit test",
    "programming",
    "typescript",
    "javascript",
    "python",
    "rust",
];

/// Keywords that suggest deep analysis.
const COMPLEX_KEYWORDS: &[&str] = &[
    "analyze",
    "analyse",
    "analysis",
    "architecture",
    "design",
    "compare",
    "evaluate",
    "research",
    "strategy",
    "complex",
    "in-depth",
    "trade-off",
    "tradeoff",
    "reasoning",
];

/// Keywords that suggest a short question.
const QUICK_KEYWORDS: &[&str] = &[
    "quick",
    "simple",
    "explain",
    "what is",
    "what's",
    "define",
    "definition",
    "how do",
    "summarize",
    "summarise",
    "brief",
];

/// Keywords that ask for the cheapest option.
const BUDGET_KEYWORDS: &[&str] = &[
    "budget",
    "cheap",
    "cost",
    "inexpensive",
    "economical",
    "affordable",
];

/// Task category inferred from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCategory {
    Coding,
    ComplexAnalysis,
    QuickQuestion,
    Budget,
}

impl TaskCategory {
    /// Categories in match priority order.
    const ORDERED: [TaskCategory; 4] = [
        TaskCategory::Coding,
        TaskCategory::ComplexAnalysis,
        TaskCategory::QuickQuestion,
        TaskCategory::Budget,
    ];

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            TaskCategory::Coding => CODING_KEYWORDS,
            TaskCategory::ComplexAnalysis => COMPLEX_KEYWORDS,
            TaskCategory::QuickQuestion => QUICK_KEYWORDS,
            TaskCategory::Budget => BUDGET_KEYWORDS,
        }
    }

    /// Short id of the model serving this category.
    pub fn model_id(&self) -> &'static str {
        match self {
            TaskCategory::Coding => "gpt-5-codex",
            TaskCategory::ComplexAnalysis => "gemini-2.5-pro",
            TaskCategory::QuickQuestion => "gpt-5-mini",
            TaskCategory::Budget => "deepseek-v3.1",
        }
    }
}

/// Deterministic keyword classifier mapping task text to a model.
///
/// Holds no mutable state and is safe to share across tasks.
pub struct KeywordModelSelector {
    models: BTreeMap<&'static str, ModelDescriptor>,
    default_model: ModelDescriptor,
}

impl KeywordModelSelector {
    /// Create a selector over the built-in catalog.
    pub fn new() -> Self {
        let models: BTreeMap<_, _> = MODELS.iter().map(|m| (m.id, *m)).collect();
        let default_model = MODELS
            .iter()
            .copied()
            .find(|m| m.id == DEFAULT_MODEL_ID)
            .unwrap_or(MODELS[0]);

        Self {
            models,
            default_model,
        }
    }

    /// Classify text into the first matching task category.
    pub fn classify(&self, text: &str) -> Option<TaskCategory> {
        let lower = text.to_lowercase();

        TaskCategory::ORDERED
            .into_iter()
            .find(|category| category.keywords().iter().any(|k| lower.contains(k)))
    }

    /// Select the model best suited for `task`.
    pub fn select_model(&self, task: &str) -> &ModelDescriptor {
        match self.classify(task) {
            Some(category) => {
                let model = self
                    .models
                    .get(category.model_id())
                    .unwrap_or(&self.default_model);
                tracing::debug!(category = ?category, model = %model.id, "Auto-selected model");
                model
            }
            None => {
                tracing::debug!(model = %self.default_model.id, "No keyword match, using default model");
                &self.default_model
            }
        }
    }

    /// Look up a model by short id.
    pub fn get_model_by_id(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.get(id)
    }

    /// Look up a model by short id, failing with `ModelNotFound`.
    pub fn resolve(&self, id: &str) -> Result<&ModelDescriptor> {
        self.get_model_by_id(id)
            .ok_or_else(|| Error::ModelNotFound(id.to_string()))
    }

    /// The full fixed mapping of short id to descriptor.
    pub fn all_models(&self) -> &BTreeMap<&'static str, ModelDescriptor> {
        &self.models
    }

    /// Model used when nothing else matches.
    pub fn default_model(&self) -> &ModelDescriptor {
        &self.default_model
    }
}

impl Default for KeywordModelSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coding_selection() {
        let selector = KeywordModelSelector::new();
        assert_eq!(selector.select_model("Please refactor this function").id, "gpt-5-codex");
        assert_eq!(selector.select_model("DEBUG my parser").id, "gpt-5-codex");
    }

    #[test]
    fn test_quick_and_budget_selection() {
        let selector = KeywordModelSelector::new();
        assert_eq!(selector.select_model("explain recursion").id, "gpt-5-mini");
        assert_eq!(selector.select_model("budget").id, "deepseek-v3.1");
        assert_eq!(
            selector.select_model("compare two database architectures").id,
            "gemini-2.5-pro"
        );
    }

    #[test]
    fn test_priority_order() {
        let selector = KeywordModelSelector::new();
        // Coding wins over every later category.
        assert_eq!(
            selector.classify("quick budget analysis of this code"),
            Some(TaskCategory::Coding)
        );
        // Complex analysis wins over quick and budget.
        assert_eq!(
            selector.classify("quick, cheap analysis"),
            Some(TaskCategory::ComplexAnalysis)
        );
    }

    #[test]
    fn test_default_fallback() {
        let selector = KeywordModelSelector::new();
        assert_eq!(selector.select_model("").id, DEFAULT_MODEL_ID);
        assert_eq!(selector.select_model("hello there").id, DEFAULT_MODEL_ID);
    }

    #[test]
    fn test_deterministic() {
        let selector = KeywordModelSelector::new();
        let first = *selector.select_model("write a unit test");
        for _ in 0..10 {
            assert_eq!(*selector.select_model("write a unit test"), first);
        }
    }

    #[test]
    fn test_lookup() {
        let selector = KeywordModelSelector::new();
        assert_eq!(
            selector.get_model_by_id("grok-code-fast-1").map(|m| m.provider_id),
            Some("x-ai/grok-code-fast-1")
        );
        assert!(selector.get_model_by_id("gpt-2").is_none());
        assert!(matches!(selector.resolve("gpt-2"), Err(Error::ModelNotFound(id)) if id == "gpt-2"));
        assert_eq!(selector.all_models().len(), MODELS.len());
    }
}
