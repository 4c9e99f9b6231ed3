//! Agent specification: the static half of an agent.

use serde::{Deserialize, Serialize};

/// Immutable configuration for one agent persona.
///
/// Built once when the agent library is assembled and never mutated
/// afterwards; runtime state lives on the handle that binds it to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique name within a library (e.g., "Market_Analyst")
    pub name: String,

    /// Short human-readable description
    #[serde(default)]
    pub description: String,

    /// System instructions sent ahead of every exchange
    #[serde(default)]
    pub instructions: String,

    /// Capability groups this agent may use (possibly empty)
    #[serde(default)]
    pub toolsets: Vec<String>,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions: instructions.into(),
            toolsets: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_toolsets<I, S>(mut self, toolsets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.toolsets = toolsets.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this agent asks for any tools.
    pub fn has_toolsets(&self) -> bool {
        !self.toolsets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let spec = AgentSpec::new("Market_Analyst", "Analyze markets.")
            .with_description("Market analysis")
            .with_toolsets(["market_data", "charting"]);
        assert_eq!(spec.name, "Market_Analyst");
        assert_eq!(spec.toolsets, vec!["market_data", "charting"]);
        assert!(spec.has_toolsets());
    }

    #[test]
    fn deserializes_with_defaults() {
        let spec: AgentSpec = serde_json::from_str(r#"{"name":"Data_Analyst"}"#).unwrap();
        assert!(spec.instructions.is_empty());
        assert!(!spec.has_toolsets());
    }
}
