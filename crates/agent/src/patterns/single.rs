//! SingleAssistant: one agent, one persistent thread.

use crate::handle::{AgentHandle, FragmentStream};
use crate::patterns::Workflow;
use crate::settings::WorkflowSettings;
use async_trait::async_trait;
use fincrew_core::backend::SendOptions;
use fincrew_core::error::Error;
use fincrew_core::message::Thread;
use tracing::{debug, info};

/// One tool-enabled agent whose thread grows with every call until reset.
#[derive(Debug)]
pub struct SingleAssistant {
    agent: AgentHandle,
    thread: Thread,
    options: SendOptions,
}

impl SingleAssistant {
    pub fn new(agent: AgentHandle, settings: &WorkflowSettings) -> Self {
        let thread = agent.create_thread();
        Self {
            agent,
            thread,
            options: settings.send,
        }
    }

    pub fn agent(&self) -> &AgentHandle {
        &self.agent
    }

    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    /// Send `message` on the shared thread.
    pub async fn chat(&mut self, message: &str) -> Result<String, Error> {
        info!(agent = %self.agent.name(), history = self.thread.len(), "Single assistant chat");
        let reply = self.agent.send(&mut self.thread, message, self.options).await?;
        debug!(agent = %self.agent.name(), tool_rounds = reply.tool_rounds, "Reply received");
        Ok(reply.message.content)
    }

    /// Like [`chat`](Self::chat), yielding the reply as it arrives.
    pub async fn chat_stream(&mut self, message: &str) -> Result<FragmentStream<'_>, Error> {
        info!(agent = %self.agent.name(), history = self.thread.len(), "Single assistant stream");
        self.agent.send_stream(&mut self.thread, message, self.options).await
    }

    pub fn reset(&mut self) {
        self.thread = self.agent.create_thread();
    }
}

#[async_trait]
impl Workflow for SingleAssistant {
    fn name(&self) -> &str {
        "single"
    }

    async fn chat(&mut self, message: &str) -> Result<String, Error> {
        SingleAssistant::chat(self, message).await
    }

    fn reset(&mut self) {
        SingleAssistant::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_helpers::ScriptedBackend;
    use fincrew_core::error::ProviderError;
    use std::sync::Arc;

    fn assistant(backend: Arc<ScriptedBackend>, settings: &WorkflowSettings) -> SingleAssistant {
        SingleAssistant::new(AgentHandle::new("Data_Analyst", "Analyze.", None, backend), settings)
    }

    #[tokio::test]
    async fn sequential_calls_share_one_thread() {
        let backend = Arc::new(ScriptedBackend::new(["first", "second"]));
        let mut assistant = assistant(backend.clone(), &WorkflowSettings::default());

        assert_eq!(assistant.chat("one").await.unwrap(), "first");
        assert_eq!(assistant.chat("two").await.unwrap(), "second");

        let calls = backend.calls();
        assert_eq!(calls[0].history_len, 0);
        assert!(calls[1].history_len >= 2);
        assert_eq!(calls[0].thread_id, calls[1].thread_id);
    }

    #[tokio::test]
    async fn reset_starts_an_independent_thread() {
        let backend = Arc::new(ScriptedBackend::new(["a", "b"]));
        let mut assistant = assistant(backend.clone(), &WorkflowSettings::default());

        assistant.chat("A").await.unwrap();
        let old_id = assistant.thread().id().clone();
        assistant.reset();
        assistant.reset();
        assistant.chat("B").await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls[1].history_len, 0);
        assert_ne!(calls[1].thread_id, old_id);
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let backend = Arc::new(ScriptedBackend::new(["unused"]).fail_on(0));
        let mut assistant = assistant(backend, &WorkflowSettings::default());

        let err = assistant.chat("hi").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::ApiError { status_code: 503, .. })));
        assert!(assistant.thread().is_empty());
    }

    #[tokio::test]
    async fn stream_then_chat_continues_same_thread() {
        let backend = Arc::new(ScriptedBackend::new(["streamed reply", "plain reply"]));
        let mut assistant = assistant(backend.clone(), &WorkflowSettings::default());

        let text = assistant.chat_stream("first").await.unwrap().collect_text().await.unwrap();
        assert_eq!(text, "streamed reply");
        assistant.chat("second").await.unwrap();

        assert_eq!(backend.calls()[1].history_len, 2);
    }

    #[tokio::test]
    async fn turn_bound_is_forwarded() {
        let backend = Arc::new(ScriptedBackend::new(["ok"]));
        let settings = WorkflowSettings::default().with_max_turns(3);
        let mut assistant = assistant(backend.clone(), &settings);
        assistant.chat("go").await.unwrap();

        let options = backend.calls()[0].options;
        assert_eq!(options.max_turns, 3);
        assert!(!options.streaming);
    }
}
