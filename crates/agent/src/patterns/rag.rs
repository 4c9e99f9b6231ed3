//! RAG pattern: retrieval-augmented prompts in front of a SingleAssistant.
//!
//! # Flow
//!
//! 1. Receive the user message
//! 2. Ask the retriever for the top passages
//! 3. Build the augmented prompt
//! 4. Send it on the assistant's persistent thread
//!
//! Retrieval never fails a call. A retriever that could not be opened, or
//! that errors at call time, is logged and the raw message is sent instead.
//! The raw message is also sent when nothing relevant is found.

use crate::handle::{AgentHandle, FragmentStream};
use crate::patterns::Workflow;
use crate::patterns::single::SingleAssistant;
use crate::settings::WorkflowSettings;
use async_trait::async_trait;
use fincrew_core::error::{Error, RetrievalError};
use fincrew_core::message::Thread;
use fincrew_core::retriever::Retriever;
use std::sync::Arc;
use tracing::{debug, warn};

/// SingleAssistant with a retrieval pre-step.
pub struct SingleAssistantRag {
    assistant: SingleAssistant,
    retriever: Option<Arc<dyn Retriever>>,
    top_k: usize,
}

impl SingleAssistantRag {
    pub fn new(
        agent: AgentHandle,
        retriever: Result<Arc<dyn Retriever>, RetrievalError>,
        settings: &WorkflowSettings,
    ) -> Self {
        let retriever = match retriever {
            Ok(retriever) => Some(retriever),
            Err(e) => {
                warn!(agent = %agent.name(), error = %e, "Retriever unavailable, sending raw messages");
                None
            }
        };
        Self {
            assistant: SingleAssistant::new(agent, settings),
            retriever,
            top_k: settings.rag_top_k,
        }
    }

    /// Whether a retriever is attached.
    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    pub fn thread(&self) -> &Thread {
        self.assistant.thread()
    }

    /// The prompt actually sent for `message`.
    pub async fn augment(&self, message: &str) -> String {
        let Some(retriever) = &self.retriever else {
            return message.to_string();
        };
        match retriever.retrieve(message, self.top_k).await {
            Ok(passages) if passages.is_empty() => {
                debug!("No passages retrieved, sending raw message");
                message.to_string()
            }
            Ok(passages) => {
                debug!(passages = passages.len(), "Augmenting prompt with retrieved context");
                build_prompt(&passages, message)
            }
            Err(e) => {
                warn!(error = %e, "Retrieval failed, sending raw message");
                message.to_string()
            }
        }
    }

    pub async fn chat(&mut self, message: &str) -> Result<String, Error> {
        let prompt = self.augment(message).await;
        self.assistant.chat(&prompt).await
    }

    pub async fn chat_stream(&mut self, message: &str) -> Result<FragmentStream<'_>, Error> {
        let prompt = self.augment(message).await;
        self.assistant.chat_stream(&prompt).await
    }

    pub fn reset(&mut self) {
        self.assistant.reset();
    }
}

fn build_prompt(passages: &[String], message: &str) -> String {
    format!("Context from documents:\n{}\n\nUser query: {message}\n", passages.join("\n\n"))
}

impl std::fmt::Debug for SingleAssistantRag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleAssistantRag")
            .field("assistant", &self.assistant)
            .field("has_retriever", &self.retriever.is_some())
            .field("top_k", &self.top_k)
            .finish()
    }
}

#[async_trait]
impl Workflow for SingleAssistantRag {
    fn name(&self) -> &str {
        "rag"
    }

    async fn chat(&mut self, message: &str) -> Result<String, Error> {
        SingleAssistantRag::chat(self, message).await
    }

    fn reset(&mut self) {
        SingleAssistantRag::reset(self);
    }
}
