//! Builds [`AgentHandle`]s from the library, the toolset registry and one
//! backend.

use crate::handle::AgentHandle;
use crate::library::AgentLibrary;
use fincrew_core::backend::Backend;
use fincrew_core::error::ConfigurationError;
use fincrew_core::tool::ToolsetRegistry;
use std::sync::Arc;
use tracing::debug;

/// Everything needed to turn an agent name into a live handle.
#[derive(Clone)]
pub struct AgentFactory {
    library: Arc<AgentLibrary>,
    toolsets: ToolsetRegistry,
    backend: Arc<dyn Backend>,
}

impl AgentFactory {
    pub fn new(library: Arc<AgentLibrary>, toolsets: ToolsetRegistry, backend: Arc<dyn Backend>) -> Self {
        Self {
            library,
            toolsets,
            backend,
        }
    }

    pub fn library(&self) -> &AgentLibrary {
        &self.library
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        self.backend.clone()
    }

    /// Bind the named persona to the backend.
    pub fn spawn(&self, name: &str) -> Result<AgentHandle, ConfigurationError> {
        self.build(name, None)
    }

    /// Like [`spawn`](Self::spawn), replacing the persona's instructions.
    pub fn spawn_with_instructions(&self, name: &str, instructions: &str) -> Result<AgentHandle, ConfigurationError> {
        self.build(name, Some(instructions))
    }

    /// A tool-less handle that exists only for the lifetime of a workflow,
    /// such as a planner or a group manager.
    pub fn ephemeral(&self, name: impl Into<String>, instructions: impl Into<String>) -> AgentHandle {
        AgentHandle::new(name, instructions, None, self.backend.clone())
    }

    fn build(&self, name: &str, instructions: Option<&str>) -> Result<AgentHandle, ConfigurationError> {
        let spec = self.library.get(name)?;
        let tools = self.toolsets.resolve(&spec.name, &spec.toolsets)?;
        debug!(
            agent = %spec.name,
            tools = tools.as_ref().map_or(0, |t| t.len()),
            custom_instructions = instructions.is_some(),
            "Spawning agent handle"
        );

        let instructions = instructions.unwrap_or(&spec.instructions);
        Ok(AgentHandle::new(&spec.name, instructions, tools, self.backend.clone())
            .with_description(&spec.description))
    }
}

impl std::fmt::Debug for AgentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentFactory")
            .field("agents", &self.library.len())
            .field("toolsets", &self.toolsets)
            .field("backend", &self.backend.name())
            .finish()
    }
}
