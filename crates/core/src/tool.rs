//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let an agent fetch market data, read filings, or chart
//! results. They are grouped into named toolsets (capability groups) that
//! agent specs reference by name; at construction time the groups an agent
//! asks for are resolved into one [`ToolRegistry`] handed to the backend.

use crate::error::{ConfigurationError, ToolError};
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_stock_data").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The tools available to one agent.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
        let tool = self.tools.get(&call.name).ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let mut result = tool.execute(call.arguments.clone()).await?;
        result.call_id = call.id.clone();
        Ok(result)
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}

/// Capability-group name → tools.
///
/// Consumed once, when agent handles are built.
#[derive(Clone, Default)]
pub struct ToolsetRegistry {
    groups: BTreeMap<String, Vec<Arc<dyn Tool>>>,
    lenient: bool,
}

impl ToolsetRegistry {
    /// A strict registry: unknown group references are configuration errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that skips unknown group references with a warning.
    pub fn lenient() -> Self {
        Self {
            groups: BTreeMap::new(),
            lenient: true,
        }
    }

    /// Register (or extend) a capability group.
    pub fn register_group(&mut self, group: impl Into<String>, tools: Vec<Arc<dyn Tool>>) {
        self.groups.entry(group.into()).or_default().extend(tools);
    }

    /// Builder-style variant of [`register_group`](Self::register_group).
    pub fn with_group(mut self, group: impl Into<String>, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.register_group(group, tools);
        self
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn contains(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Resolve the groups referenced by `agent` into one registry.
    ///
    /// Returns `Ok(None)` when the agent ends up with no tools at all.
    pub fn resolve(
        &self,
        agent: &str,
        groups: &[String],
    ) -> std::result::Result<Option<Arc<ToolRegistry>>, ConfigurationError> {
        let mut registry = ToolRegistry::new();
        for group in groups {
            match self.groups.get(group) {
                Some(tools) => {
                    for tool in tools {
                        registry.register(tool.clone());
                    }
                }
                None if self.lenient => {
                    warn!(agent, toolset = %group, "Toolset not registered, skipping");
                }
                None => {
                    return Err(ConfigurationError::MissingToolset {
                        agent: agent.to_string(),
                        toolset: group.clone(),
                        available: self.group_names(),
                    });
                }
            }
        }
        Ok(if registry.is_empty() { None } else { Some(Arc::new(registry)) })
    }
}

impl std::fmt::Debug for ToolsetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsetRegistry")
            .field("groups", &self.group_names())
            .field("lenient", &self.lenient)
            .finish()
    }
}
