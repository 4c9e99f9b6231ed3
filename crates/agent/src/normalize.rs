//! Response normalization.
//!
//! Workflows produce results of several shapes: a plain string, a backend
//! reply, a list of group-session events, or a JSON mapping handed over by
//! some other caller. [`normalize`] turns each of them into one canonical
//! text form.

use crate::session_event::SessionEvent;
use fincrew_core::backend::ExchangeReply;
use serde_json::{Map, Value};

/// Every result shape the normalizer knows about.
#[derive(Debug, Clone)]
pub enum RawResponse {
    Text(String),
    Reply(ExchangeReply),
    Events(Vec<SessionEvent>),
    Map(Map<String, Value>),
    /// Anything else; stringified.
    Unknown(Value),
}

impl From<String> for RawResponse {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RawResponse {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<ExchangeReply> for RawResponse {
    fn from(reply: ExchangeReply) -> Self {
        Self::Reply(reply)
    }
}

impl From<Vec<SessionEvent>> for RawResponse {
    fn from(events: Vec<SessionEvent>) -> Self {
        Self::Events(events)
    }
}

impl From<Value> for RawResponse {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(map) => Self::Map(map),
            other => Self::Unknown(other),
        }
    }
}

/// Canonical text for any result shape.
pub fn normalize(response: impl Into<RawResponse>) -> String {
    match response.into() {
        RawResponse::Text(text) => text,
        RawResponse::Reply(reply) => reply.message.content,
        RawResponse::Events(events) => normalize_events(&events),
        RawResponse::Map(map) => normalize_map(map),
        RawResponse::Unknown(value) => value.to_string(),
    }
}

fn normalize_events(events: &[SessionEvent]) -> String {
    let outputs: Vec<&str> = events.iter().filter_map(SessionEvent::output_text).collect();
    if !outputs.is_empty() {
        return outputs.join("\n\n");
    }
    let types: Vec<&str> = events.iter().map(SessionEvent::event_type).collect();
    format!("Workflow completed with events: {}", types.join(", "))
}

fn normalize_map(mut map: Map<String, Value>) -> String {
    if let Some(text) = map.remove("text") {
        return value_text(text);
    }
    if let Some(content) = map.remove("content") {
        return value_text(content);
    }
    Value::Object(map).to_string()
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

const BANNER_WIDTH: usize = 60;
const MULTI_AGENT_MIN_CHARS: usize = 200;

/// Normalize, then frame the text with a banner when it looks like the
/// output of several agents.
pub fn format_multi_agent_response(response: impl Into<RawResponse>) -> String {
    let text = normalize(response);
    if text.contains("\n\n") || text.chars().count() > MULTI_AGENT_MIN_CHARS {
        let rule = "=".repeat(BANNER_WIDTH);
        format!("Multi-Agent Response:\n{rule}\n{text}\n{rule}")
    } else {
        text
    }
}
