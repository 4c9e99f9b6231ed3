//! Multi-agent orchestration for financial analysis.
//!
//! Agents are personas from an [`AgentLibrary`] bound to a backend as
//! [`AgentHandle`]s. Workflows own handles and their conversation threads
//! and coordinate them:
//!
//! 1. **Single**: one agent, one growing thread
//! 2. **RAG**: retrieved passages prepended to each message
//! 3. **Shadow**: a planner's plan handed to an executor
//! 4. **Group**: a roster taking turns, bounded by rounds
//! 5. **Leader**: a leader that may hand one sub-task to a team member
//!
//! Every backend exchange is awaited before the next is issued.

pub mod delegation;
pub mod factory;
pub mod handle;
pub mod library;
pub mod normalize;
pub mod patterns;
pub mod pipeline;
pub mod retrieval;
pub mod session_event;
pub mod settings;

pub use delegation::{DelegationMarker, parse_delegation};
pub use factory::AgentFactory;
pub use handle::{AgentHandle, FragmentStream};
pub use library::AgentLibrary;
pub use normalize::{RawResponse, format_multi_agent_response, normalize};
pub use patterns::{
    GroupChatResult, LeaderOutcome, MultiAssistant, MultiAssistantWithLeader, SingleAssistant, SingleAssistantRag,
    SingleAssistantShadow, SpeakerSelector, TranscriptEntry, Workflow,
};
pub use patterns::{leader_workflow, multi_assistant, rag_assistant, shadow_assistant, single_assistant};
pub use pipeline::{Pipeline, PipelineOutput, PipelineStage, StageOutput, extract_json};
pub use retrieval::DocumentRetriever;
pub use session_event::{SessionEvent, StopReason};
pub use settings::{DEFAULT_SHADOW_INSTRUCTIONS, WorkflowSettings};
