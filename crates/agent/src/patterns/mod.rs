//! Coordination patterns.
//!
//! 1. **SingleAssistant**: one agent on one persistent thread
//! 2. **SingleAssistantRag**: retrieval-augmented prompt, then SingleAssistant
//! 3. **SingleAssistantShadow**: a planner thread feeding an executor thread
//! 4. **MultiAssistant**: round-bounded group chat over a fixed roster
//! 5. **MultiAssistantWithLeader**: a leader with single-hop delegation
//!
//! Every pattern owns its handles and threads. Calls are strictly
//! sequential: each backend exchange is awaited before the next one is
//! issued, and `&mut self` keeps two `chat` calls from interleaving on the
//! same instance.

pub mod group;
pub mod leader;
pub mod rag;
pub mod shadow;
pub mod single;

pub use group::{GroupChatResult, MultiAssistant, SpeakerSelector, TranscriptEntry};
pub use leader::{LeaderOutcome, MultiAssistantWithLeader};
pub use rag::SingleAssistantRag;
pub use shadow::SingleAssistantShadow;
pub use single::SingleAssistant;

use crate::factory::AgentFactory;
use crate::settings::WorkflowSettings;
use async_trait::async_trait;
use fincrew_core::error::{ConfigurationError, Error, RetrievalError};
use fincrew_core::retriever::Retriever;
use std::sync::Arc;

/// Lifecycle shared by every pattern.
#[async_trait]
pub trait Workflow: Send {
    /// Short name of the pattern, for logs.
    fn name(&self) -> &str;

    /// Run one task and return the normalized response.
    async fn chat(&mut self, message: &str) -> Result<String, Error>;

    /// Replace every owned thread with an empty one. Idempotent.
    fn reset(&mut self);
}

/// One agent, one persistent thread.
pub fn single_assistant(
    factory: &AgentFactory,
    agent: &str,
    settings: &WorkflowSettings,
) -> Result<SingleAssistant, ConfigurationError> {
    Ok(SingleAssistant::new(factory.spawn(agent)?, settings))
}

/// SingleAssistant with a retrieval pre-step.
///
/// `retriever` is whatever opening the retriever produced; an error here is
/// absorbed and the workflow sends raw messages.
pub fn rag_assistant(
    factory: &AgentFactory,
    agent: &str,
    retriever: Result<Arc<dyn Retriever>, RetrievalError>,
    settings: &WorkflowSettings,
) -> Result<SingleAssistantRag, ConfigurationError> {
    Ok(SingleAssistantRag::new(factory.spawn(agent)?, retriever, settings))
}

/// A tool-less planner named `{agent}_Shadow` in front of `agent`.
pub fn shadow_assistant(
    factory: &AgentFactory,
    agent: &str,
    settings: &WorkflowSettings,
) -> Result<SingleAssistantShadow, ConfigurationError> {
    let primary = factory.spawn(agent)?;
    let shadow = factory.ephemeral(format!("{agent}_Shadow"), &settings.shadow_instructions);
    Ok(SingleAssistantShadow::new(primary, shadow, settings))
}

/// Group chat over `agents`, with the backend choosing each speaker.
pub fn multi_assistant<S: AsRef<str>>(
    factory: &AgentFactory,
    agents: &[S],
    settings: &WorkflowSettings,
) -> Result<MultiAssistant, Error> {
    let roster = agents
        .iter()
        .map(|name| factory.spawn(name.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let manager = factory.ephemeral(group::MANAGER_NAME, &settings.selection_instructions);
    MultiAssistant::new(roster, manager, settings)
}

/// `leader` plus a team it can hand one sub-task to per call.
pub fn leader_workflow<S: AsRef<str>>(
    factory: &AgentFactory,
    leader: &str,
    team: &[S],
    settings: &WorkflowSettings,
) -> Result<MultiAssistantWithLeader, ConfigurationError> {
    let leader = factory.spawn(leader)?;
    let team = team
        .iter()
        .map(|name| factory.spawn(name.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MultiAssistantWithLeader::new(leader, team, settings))
}

#[cfg(test)]
pub(crate) mod test_helpers;
