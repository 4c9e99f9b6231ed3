//! Shadow pattern: plan first, then execute.
//!
//! ```text
//! message ──▶ shadow planner ──plan──▶ primary executor ──▶ response
//!             (own thread)             (own thread)
//! ```
//!
//! Both threads persist across calls so the planner remembers earlier
//! plans. A failed planning exchange aborts the call before the executor
//! runs.

use crate::handle::{AgentHandle, FragmentStream};
use crate::patterns::Workflow;
use crate::settings::WorkflowSettings;
use async_trait::async_trait;
use fincrew_core::backend::SendOptions;
use fincrew_core::error::Error;
use fincrew_core::message::Thread;
use tracing::{debug, info};

#[derive(Debug)]
pub struct SingleAssistantShadow {
    primary: AgentHandle,
    shadow: AgentHandle,
    primary_thread: Thread,
    shadow_thread: Thread,
    options: SendOptions,
}

impl SingleAssistantShadow {
    pub fn new(primary: AgentHandle, shadow: AgentHandle, settings: &WorkflowSettings) -> Self {
        Self {
            primary_thread: primary.create_thread(),
            shadow_thread: shadow.create_thread(),
            primary,
            shadow,
            options: settings.send,
        }
    }

    pub fn primary(&self) -> &AgentHandle {
        &self.primary
    }

    pub fn shadow(&self) -> &AgentHandle {
        &self.shadow
    }

    pub fn primary_thread(&self) -> &Thread {
        &self.primary_thread
    }

    pub fn shadow_thread(&self) -> &Thread {
        &self.shadow_thread
    }

    async fn plan(&mut self, message: &str) -> Result<String, Error> {
        info!(agent = %self.shadow.name(), "Planning");
        let prompt = format!("create an execution plan for: {message}");
        let plan = self.shadow.send(&mut self.shadow_thread, &prompt, self.options).await?;
        debug!(agent = %self.shadow.name(), plan_len = plan.text().len(), "Plan ready");
        Ok(plan.message.content)
    }

    pub async fn chat(&mut self, message: &str) -> Result<String, Error> {
        let plan = self.plan(message).await?;
        info!(agent = %self.primary.name(), "Executing plan");
        let reply = self
            .primary
            .send(&mut self.primary_thread, &execution_prompt(&plan, message), self.options)
            .await?;
        Ok(reply.message.content)
    }

    /// Plans as usual, then streams the execution reply.
    pub async fn chat_stream(&mut self, message: &str) -> Result<FragmentStream<'_>, Error> {
        let plan = self.plan(message).await?;
        info!(agent = %self.primary.name(), "Executing plan (streaming)");
        self.primary
            .send_stream(&mut self.primary_thread, &execution_prompt(&plan, message), self.options)
            .await
    }

    /// Replace both threads together.
    pub fn reset(&mut self) {
        self.shadow_thread = self.shadow.create_thread();
        self.primary_thread = self.primary.create_thread();
    }
}

fn execution_prompt(plan: &str, message: &str) -> String {
    format!("{plan}\n\noriginal request: {message}")
}

#[async_trait]
impl Workflow for SingleAssistantShadow {
    fn name(&self) -> &str {
        "shadow"
    }

    async fn chat(&mut self, message: &str) -> Result<String, Error> {
        SingleAssistantShadow::chat(self, message).await
    }

    fn reset(&mut self) {
        SingleAssistantShadow::reset(self);
    }
}
