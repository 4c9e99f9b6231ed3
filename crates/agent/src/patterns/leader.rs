//! Leader pattern: hierarchical single-hop delegation.
//!
//! ```text
//! message ──▶ leader ──[Member] instruction──▶ member
//!               ▲                                 │
//!               └──── "Result from Member: …" ◀───┘
//! ```
//!
//! At most one hop per call: the leader's second reply is returned as-is,
//! even if it contains another marker.

use crate::delegation::parse_delegation;
use crate::handle::AgentHandle;
use crate::patterns::Workflow;
use crate::settings::WorkflowSettings;
use async_trait::async_trait;
use fincrew_core::backend::SendOptions;
use fincrew_core::error::Error;
use fincrew_core::message::Thread;
use tracing::{debug, info, warn};

/// What one leader call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderOutcome {
    /// The response returned to the caller.
    pub text: String,
    /// The team member the leader delegated to, if any.
    pub delegated_to: Option<String>,
    /// Backend exchanges performed: 1 without delegation, 3 with.
    pub exchanges: u32,
}

#[derive(Debug)]
pub struct MultiAssistantWithLeader {
    leader: AgentHandle,
    leader_thread: Thread,
    team: Vec<(AgentHandle, Thread)>,
    options: SendOptions,
}

impl MultiAssistantWithLeader {
    pub fn new(leader: AgentHandle, team: Vec<AgentHandle>, settings: &WorkflowSettings) -> Self {
        Self {
            leader_thread: leader.create_thread(),
            leader,
            team: team
                .into_iter()
                .map(|member| {
                    let thread = member.create_thread();
                    (member, thread)
                })
                .collect(),
            options: settings.send,
        }
    }

    pub fn leader(&self) -> &AgentHandle {
        &self.leader
    }

    pub fn team_names(&self) -> Vec<&str> {
        self.team.iter().map(|(member, _)| member.name()).collect()
    }

    pub fn leader_thread(&self) -> &Thread {
        &self.leader_thread
    }

    pub fn member_thread(&self, name: &str) -> Option<&Thread> {
        self.team.iter().find(|(member, _)| member.name() == name).map(|(_, thread)| thread)
    }

    pub async fn chat_detailed(&mut self, message: &str) -> Result<LeaderOutcome, Error> {
        info!(leader = %self.leader.name(), team = ?self.team_names(), "Leader chat");
        let first = self.leader.send(&mut self.leader_thread, message, self.options).await?;
        let leader_text = first.message.content;

        let Some(marker) = parse_delegation(&leader_text) else {
            debug!(leader = %self.leader.name(), "No delegation marker");
            return Ok(LeaderOutcome {
                text: leader_text,
                delegated_to: None,
                exchanges: 1,
            });
        };

        let Some((member, member_thread)) = self.team.iter_mut().find(|(m, _)| m.name() == marker.target) else {
            warn!(
                leader = %self.leader.name(),
                target = %marker.target,
                "Delegation target is not on the team, returning leader reply"
            );
            return Ok(LeaderOutcome {
                text: leader_text,
                delegated_to: None,
                exchanges: 1,
            });
        };

        info!(leader = %self.leader.name(), member = %member.name(), "Delegating");
        let member_reply = member.send(member_thread, &marker.instruction, self.options).await?;

        let feedback = format!("Result from {}: {}", marker.target, member_reply.text());
        let last = self.leader.send(&mut self.leader_thread, &feedback, self.options).await?;

        Ok(LeaderOutcome {
            text: last.message.content,
            delegated_to: Some(marker.target),
            exchanges: 3,
        })
    }

    pub async fn chat(&mut self, message: &str) -> Result<String, Error> {
        Ok(self.chat_detailed(message).await?.text)
    }

    /// Replace the leader's thread and every member's thread.
    pub fn reset(&mut self) {
        self.leader_thread = self.leader.create_thread();
        for (member, thread) in &mut self.team {
            *thread = member.create_thread();
        }
    }
}

#[async_trait]
impl Workflow for MultiAssistantWithLeader {
    fn name(&self) -> &str {
        "leader"
    }

    async fn chat(&mut self, message: &str) -> Result<String, Error> {
        MultiAssistantWithLeader::chat(self, message).await
    }

    fn reset(&mut self) {
        MultiAssistantWithLeader::reset(self);
    }
}
