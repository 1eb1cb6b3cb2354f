use serde::Serialize;

/// Static description of an upstream model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    /// Caller-facing short id.
    pub id: &'static str,
    /// Identifier sent to the upstream provider.
    pub provider_id: &'static str,
    /// Human description.
    pub description: &'static str,
    /// Task-affinity tags.
    pub best_for: &'static [&'static str],
}

/// Model listing entry exposed to the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub id: String,
    pub description: String,
    #[serde(rename = "bestFor")]
    pub best_for: Vec<String>,
}

impl From<&ModelDescriptor> for ModelSummary {
    fn from(model: &ModelDescriptor) -> Self {
        Self {
            name: model.id.to_string(),
            id: model.provider_id.to_string(),
            description: model.description.to_string(),
            best_for: model.best_for.iter().map(|tag| tag.to_string()).collect(),
        }
    }
}
