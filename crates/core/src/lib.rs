//! # fincrew core
//!
//! Domain types, traits, and error definitions for the fincrew agent
//! orchestrator. This crate has **no framework dependencies**; it defines
//! the domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the orchestration engine is a trait here:
//! - [`Provider`]: one raw LLM completion (HTTP backends implement this)
//! - [`Backend`]: one agent exchange, including any tool-call round-trips
//! - [`Tool`]: a callable capability grouped into toolsets
//! - [`Retriever`]: passage lookup for retrieval-augmented prompts
//!
//! Implementations live in their respective crates, and tests swap in
//! scripted stand-ins.

pub mod agent;
pub mod backend;
pub mod error;
pub mod message;
pub mod provider;
pub mod retriever;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::AgentSpec;
pub use backend::{Backend, ExchangeEvent, ExchangeReply, ExchangeRequest, ExchangeStream, SendOptions};
pub use error::{ConfigurationError, Error, ProviderError, Result, RetrievalError, WorkflowError};
pub use message::{Message, MessageToolCall, Role, Thread, ThreadId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition, Usage};
pub use retriever::Retriever;
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolsetRegistry};
