//! Shared test helpers for pattern tests.

use async_trait::async_trait;
use fincrew_core::backend::{Backend, ExchangeEvent, ExchangeReply, ExchangeRequest, ExchangeStream, SendOptions};
use fincrew_core::error::ProviderError;
use fincrew_core::message::{Message, ThreadId};
use std::collections::VecDeque;
use std::sync::Mutex;

/// What the backend saw for one exchange.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub agent: String,
    pub instructions: String,
    pub input: String,
    pub history_len: usize,
    pub thread_id: ThreadId,
    pub options: SendOptions,
}

/// A backend that replays scripted replies in order and records every
/// request it receives.
///
/// Panics if more calls are made than replies provided, unless a default
/// reply was set.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<RecordedCall>>,
    fail_on: Option<usize>,
    default_reply: Option<String>,
}

impl ScriptedBackend {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
            fail_on: None,
            default_reply: None,
        }
    }

    /// Make call number `index` (0-based) fail with an API error.
    pub fn fail_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    /// Reply with `text` once the script runs out.
    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.default_reply = Some(text.into());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next_reply(&self, request: &ExchangeRequest) -> Result<ExchangeReply, ProviderError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                agent: request.agent.clone(),
                instructions: request.instructions.clone(),
                input: request.input.clone(),
                history_len: request.history.len(),
                thread_id: request.thread_id.clone(),
                options: request.options,
            });
            calls.len() - 1
        };

        if self.fail_on == Some(index) {
            return Err(ProviderError::ApiError {
                status_code: 503,
                message: "scripted failure".into(),
            });
        }

        let text = match self.replies.lock().unwrap().pop_front() {
            Some(text) => text,
            None => self
                .default_reply
                .clone()
                .unwrap_or_else(|| panic!("ScriptedBackend: no reply scripted for call #{index}")),
        };
        Ok(ExchangeReply::from_message(Message::assistant(text)))
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn exchange(&self, request: ExchangeRequest) -> Result<ExchangeReply, ProviderError> {
        self.next_reply(&request)
    }

    async fn exchange_stream(&self, request: ExchangeRequest) -> Result<ExchangeStream, ProviderError> {
        let reply = self.next_reply(&request)?;
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        tokio::spawn(async move {
            let fragments: Vec<String> = reply.text().split_inclusive(' ').map(String::from).collect();
            for fragment in fragments {
                if tx.send(Ok(ExchangeEvent::Fragment(fragment))).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(Ok(ExchangeEvent::Completed(reply))).await;
        });
        Ok(rx)
    }
}
