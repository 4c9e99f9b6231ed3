//! `ProviderBackend`: the backend collaborator built on a raw provider.
//!
//! One exchange = system instructions + thread history + the new input,
//! sent to the model; any tool calls in the reply are executed and fed back
//! until the model answers in plain text or the turn budget runs out.
//!
//! Streamed fragments add up to the final reply text. Text the model
//! writes alongside tool calls stays in the recorded turns but is not
//! streamed.

use async_trait::async_trait;
use fincrew_core::backend::{Backend, ExchangeEvent, ExchangeReply, ExchangeRequest, ExchangeStream};
use fincrew_core::error::ProviderError;
use fincrew_core::message::{Message, MessageToolCall};
use fincrew_core::provider::{Provider, ProviderRequest, Usage};
use fincrew_core::tool::{ToolCall, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, warn};

const BUDGET_EXHAUSTED: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// A [`Backend`] that drives an LLM [`Provider`] and resolves tool calls.
#[derive(Clone)]
pub struct ProviderBackend {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: Option<u32>,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: None,
        }
    }

    /// Set the max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The prompt for one exchange, before any turns it produces.
    fn base_messages(request: &ExchangeRequest) -> Vec<Message> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if !request.instructions.is_empty() {
            messages.push(Message::system(&request.instructions));
        }
        messages.extend(request.history.iter().cloned());
        messages.push(Message::user(&request.input));
        messages
    }

    fn provider_request(
        &self,
        request: &ExchangeRequest,
        base: &[Message],
        turns: &[Message],
        offer_tools: bool,
        stream: bool,
    ) -> ProviderRequest {
        let tools = match (&request.tools, offer_tools) {
            (Some(tools), true) => tools.definitions(),
            _ => Vec::new(),
        };
        ProviderRequest {
            model: self.model.clone(),
            messages: base.iter().chain(turns.iter()).cloned().collect(),
            temperature: request.options.temperature,
            max_tokens: self.max_tokens,
            tools,
            stream,
        }
    }
}

/// Execute every call of one assistant turn, in order.
///
/// Failures are reported back to the model as tool results so it can recover.
async fn execute_tool_calls(tools: &ToolRegistry, calls: &[MessageToolCall]) -> Vec<Message> {
    let mut results = Vec::with_capacity(calls.len());
    for tc in calls {
        let call = ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments: serde_json::from_str(&tc.arguments).unwrap_or_default(),
        };

        match tools.execute(&call).await {
            Ok(result) => {
                debug!(tool = %tc.name, success = result.success, "Tool executed");
                results.push(Message::tool_result(&tc.id, &result.output));
            }
            Err(e) => {
                warn!(tool = %tc.name, error = %e, "Tool execution failed");
                results.push(Message::tool_result(&tc.id, format!("Error: {e}")));
            }
        }
    }
    results
}

/// Close an exchange: the final turn never carries unresolved tool calls.
fn finish_turn(mut message: Message) -> Message {
    if !message.tool_calls.is_empty() {
        message.tool_calls.clear();
        if message.content.trim().is_empty() {
            message.content = BUDGET_EXHAUSTED.into();
        }
    }
    message
}

fn into_reply(turns: Vec<Message>, usage: Usage, tool_rounds: u32) -> Result<ExchangeReply, ProviderError> {
    let message = turns
        .last()
        .cloned()
        .ok_or_else(|| ProviderError::StreamInterrupted("exchange produced no turns".into()))?;
    Ok(ExchangeReply {
        message,
        turns,
        usage: (usage.total_tokens > 0).then_some(usage),
        tool_rounds,
    })
}

#[async_trait]
impl Backend for ProviderBackend {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn exchange(&self, request: ExchangeRequest) -> Result<ExchangeReply, ProviderError> {
        let base = Self::base_messages(&request);
        let max_turns = request.options.max_turns.max(1);
        let mut turns: Vec<Message> = Vec::new();
        let mut usage = Usage::default();
        let mut tool_rounds = 0;

        for turn in 1..=max_turns {
            let last_turn = turn == max_turns;
            debug!(agent = %request.agent, thread = %request.thread_id, turn, "Backend round-trip");

            let provider_request = self.provider_request(&request, &base, &turns, !last_turn, false);
            let response = self.provider.complete(provider_request).await?;
            if let Some(u) = &response.usage {
                usage.accumulate(u);
            }

            let tools = match &request.tools {
                Some(tools) if !response.message.tool_calls.is_empty() && !last_turn => tools,
                _ => {
                    if last_turn && !response.message.tool_calls.is_empty() {
                        warn!(agent = %request.agent, max_turns, "Tool-turn budget exhausted");
                    }
                    turns.push(finish_turn(response.message));
                    return into_reply(turns, usage, tool_rounds);
                }
            };

            let calls = response.message.tool_calls.clone();
            turns.push(response.message);
            turns.extend(execute_tool_calls(tools, &calls).await);
            tool_rounds += 1;
        }

        // max_turns >= 1 and the last turn always returns above
        into_reply(turns, usage, tool_rounds)
    }

    async fn exchange_stream(&self, request: ExchangeRequest) -> Result<ExchangeStream, ProviderError> {
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let backend = self.clone();

        tokio::spawn(async move {
            let base = Self::base_messages(&request);
            let max_turns = request.options.max_turns.max(1);
            let mut turns: Vec<Message> = Vec::new();
            let mut usage = Usage::default();
            let mut tool_rounds = 0;

            for turn in 1..=max_turns {
                let last_turn = turn == max_turns;
                // Text of a turn that may still call tools is held until the turn ends
                let hold_back = request.tools.is_some() && !last_turn;
                let provider_request = backend.provider_request(&request, &base, &turns, !last_turn, true);
                let mut chunks = match backend.provider.stream(provider_request).await {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };

                let mut content = String::new();
                let mut tool_calls = Vec::new();
                while let Some(chunk) = chunks.recv().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    };
                    if let Some(text) = chunk.content.filter(|t| !t.is_empty()) {
                        content.push_str(&text);
                        if !hold_back && tx.send(Ok(ExchangeEvent::Fragment(text))).await.is_err() {
                            debug!(agent = %request.agent, "Stream consumer dropped");
                            return;
                        }
                    }
                    if let Some(u) = &chunk.usage {
                        usage.accumulate(u);
                    }
                    if chunk.done {
                        tool_calls = chunk.tool_calls;
                        break;
                    }
                }

                let streamed = if hold_back { String::new() } else { content.clone() };
                let mut message = Message::assistant(content);
                message.tool_calls = tool_calls;

                let tools = match &request.tools {
                    Some(tools) if !message.tool_calls.is_empty() && !last_turn => tools.clone(),
                    _ => {
                        if last_turn && !message.tool_calls.is_empty() {
                            warn!(agent = %request.agent, max_turns, "Tool-turn budget exhausted");
                        }
                        // Fragments always add up to the final reply text
                        let message = finish_turn(message);
                        let pending = message.content.strip_prefix(streamed.as_str()).unwrap_or_default();
                        if !pending.is_empty() && tx.send(Ok(ExchangeEvent::Fragment(pending.to_string()))).await.is_err() {
                            debug!(agent = %request.agent, "Stream consumer dropped");
                            return;
                        }
                        turns.push(message);
                        let event = into_reply(std::mem::take(&mut turns), usage, tool_rounds)
                            .map(ExchangeEvent::Completed);
                        let _ = tx.send(event).await;
                        return;
                    }
                };

                let calls = message.tool_calls.clone();
                turns.push(message);
                turns.extend(execute_tool_calls(&tools, &calls).await);
                tool_rounds += 1;
            }
        });

        Ok(rx)
    }
}
