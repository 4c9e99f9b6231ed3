//! Backend trait: one agent exchange, as seen by the orchestrator.
//!
//! An exchange takes an agent's instructions, the prior turns of its thread
//! and one new input, and produces the turns the agent added in response.
//! Tool-call resolution happens entirely inside the backend, bounded by
//! [`SendOptions::max_turns`]; the orchestrator only sees the final reply.

use crate::error::ProviderError;
use crate::message::{Message, ThreadId};
use crate::provider::Usage;
use crate::tool::ToolRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-exchange options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SendOptions {
    /// Sampling temperature, always within 0.0–1.0.
    pub temperature: f32,

    /// Whether the reply is delivered as a fragment stream.
    #[serde(default)]
    pub streaming: bool,

    /// Upper bound on model round-trips while resolving tool calls.
    pub max_turns: u32,
}

impl SendOptions {
    pub fn new() -> Self {
        Self {
            temperature: 0.7,
            streaming: false,
            max_turns: 10,
        }
    }

    /// Set the temperature, clamped into 0.0–1.0.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    /// Set the tool-turn bound forwarded to the backend (at least 1).
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

impl Default for SendOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a backend needs to run one exchange.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    /// Name of the agent speaking.
    pub agent: String,

    /// The agent's system instructions.
    pub instructions: String,

    /// Thread the exchange belongs to.
    pub thread_id: ThreadId,

    /// Turns already on the thread, oldest first.
    pub history: Vec<Message>,

    /// The new input text.
    pub input: String,

    /// Tools the agent may call, if it has any.
    pub tools: Option<Arc<ToolRegistry>>,

    pub options: SendOptions,
}

/// The outcome of one exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeReply {
    /// The final assistant message.
    pub message: Message,

    /// Every turn produced by the exchange, in order, ending with `message`.
    /// Intermediate tool-call and tool-result turns come first.
    pub turns: Vec<Message>,

    /// Token usage summed over all round-trips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// How many tool-call rounds the backend resolved.
    #[serde(default)]
    pub tool_rounds: u32,
}

impl ExchangeReply {
    /// A reply made of a single assistant message.
    pub fn from_message(message: Message) -> Self {
        Self {
            turns: vec![message.clone()],
            message,
            usage: None,
            tool_rounds: 0,
        }
    }

    /// The final reply text.
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

/// One item of a streamed exchange.
#[derive(Debug, Clone)]
pub enum ExchangeEvent {
    /// A partial text fragment of the final reply.
    Fragment(String),
    /// The exchange finished; always the last event of a healthy stream.
    Completed(ExchangeReply),
}

/// Receiver side of a streamed exchange. Finite and single-pass.
pub type ExchangeStream = tokio::sync::mpsc::Receiver<std::result::Result<ExchangeEvent, ProviderError>>;

/// The backend collaborator.
///
/// Timeouts and retries, if any, belong to implementations of this trait.
#[async_trait]
pub trait Backend: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Run one exchange to completion.
    async fn exchange(&self, request: ExchangeRequest) -> std::result::Result<ExchangeReply, ProviderError>;

    /// Run one exchange, delivering the reply as fragments.
    ///
    /// Default implementation calls `exchange()` and emits the whole text as
    /// one fragment followed by the completion event.
    async fn exchange_stream(&self, request: ExchangeRequest) -> std::result::Result<ExchangeStream, ProviderError> {
        let reply = self.exchange(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let _ = tx.send(Ok(ExchangeEvent::Fragment(reply.message.content.clone()))).await;
        let _ = tx.send(Ok(ExchangeEvent::Completed(reply))).await;
        Ok(rx)
    }
}
