//! MultiAssistant: round-bounded group chat.
//!
//! A fixed roster shares one transcript. Each round exactly one member is
//! selected, receives the transcript entries it has not seen yet on its
//! own thread, and its reply is appended to the transcript. The session
//! ends when a reply contains the termination token, when `max_rounds`
//! rounds have run, or when a custom selector declines to pick anyone.
//!
//! # Speaker selection
//!
//! - With a custom selector, the selector sees the transcript and roster
//!   names and returns the next speaker. A name outside the roster is an
//!   error.
//! - Otherwise a group manager agent is asked on a fresh thread each round.
//!   Its reply is matched against the roster: an exact name first, then the
//!   earliest roster name mentioned. A reply that names nobody falls back to
//!   round-robin.

use crate::handle::AgentHandle;
use crate::normalize::normalize;
use crate::patterns::Workflow;
use crate::session_event::{SessionEvent, StopReason};
use crate::settings::WorkflowSettings;
use async_trait::async_trait;
use fincrew_core::backend::SendOptions;
use fincrew_core::error::{ConfigurationError, Error, WorkflowError};
use fincrew_core::message::Thread;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Name of the agent that picks speakers when no custom selector is set.
pub const MANAGER_NAME: &str = "Group_Manager";

/// Speaker label for the task that opens a session.
pub const USER_SPEAKER: &str = "user";

/// Sent to a speaker that has nothing new to read.
const CONTINUE_PROMPT: &str = "Please continue.";

/// One line of the shared transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: String,
    pub content: String,
}

impl TranscriptEntry {
    pub fn new(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            content: content.into(),
        }
    }
}

/// Picks the next speaker from `(transcript, roster names)`; `None` ends
/// the session.
pub type SpeakerSelector = Box<dyn Fn(&[TranscriptEntry], &[String]) -> Option<String> + Send + Sync>;

/// Outcome of one group session.
#[derive(Debug, Clone)]
pub struct GroupChatResult {
    /// Transcript entries added by this session, starting with the task.
    pub transcript: Vec<TranscriptEntry>,
    pub events: Vec<SessionEvent>,
    pub rounds: u32,
    pub stop_reason: StopReason,
}

impl GroupChatResult {
    pub fn text(&self) -> String {
        normalize(self.events.clone())
    }
}

struct Member {
    handle: AgentHandle,
    thread: Thread,
    /// Transcript entries before this index have been delivered.
    cursor: usize,
}

pub struct MultiAssistant {
    members: Vec<Member>,
    roster: Vec<String>,
    manager: AgentHandle,
    selector: Option<SpeakerSelector>,
    transcript: Vec<TranscriptEntry>,
    last_speaker: Option<usize>,
    options: SendOptions,
    max_rounds: u32,
    termination_token: String,
}

impl MultiAssistant {
    pub fn new(roster: Vec<AgentHandle>, manager: AgentHandle, settings: &WorkflowSettings) -> Result<Self, Error> {
        if roster.is_empty() {
            return Err(WorkflowError::EmptyRoster.into());
        }
        if settings.max_rounds == 0 {
            return Err(ConfigurationError::Invalid("max_rounds must be at least 1".into()).into());
        }
        let names = roster.iter().map(|h| h.name().to_string()).collect();
        let members = roster
            .into_iter()
            .map(|handle| Member {
                thread: handle.create_thread(),
                handle,
                cursor: 0,
            })
            .collect();

        Ok(Self {
            members,
            roster: names,
            manager,
            selector: None,
            transcript: Vec::new(),
            last_speaker: None,
            options: settings.send,
            max_rounds: settings.max_rounds,
            termination_token: settings.termination_token.clone(),
        })
    }

    /// Replace backend-driven selection with a pure function.
    pub fn with_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&[TranscriptEntry], &[String]) -> Option<String> + Send + Sync + 'static,
    {
        self.selector = Some(Box::new(selector));
        self
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    /// The running transcript, across sessions since the last reset.
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn member_thread(&self, name: &str) -> Option<&Thread> {
        self.members.iter().find(|m| m.handle.name() == name).map(|m| &m.thread)
    }

    /// Run one bounded session for `message`.
    pub async fn chat_session(&mut self, message: &str) -> Result<GroupChatResult, Error> {
        info!(roster = ?self.roster, max_rounds = self.max_rounds, "Group session started");
        let start = self.transcript.len();
        self.transcript.push(TranscriptEntry::new(USER_SPEAKER, message));

        let mut events = vec![SessionEvent::Started {
            task: message.to_string(),
            roster: self.roster.clone(),
        }];
        let mut rounds = 0;

        let stop_reason = loop {
            if rounds >= self.max_rounds {
                break StopReason::MaxRounds;
            }
            let Some(index) = self.select_speaker(message).await? else {
                break StopReason::SelectorDeclined;
            };
            rounds += 1;
            self.last_speaker = Some(index);

            let speaker = self.roster[index].clone();
            debug!(round = rounds, speaker = %speaker, "Speaker selected");
            events.push(SessionEvent::SpeakerSelected {
                round: rounds,
                speaker: speaker.clone(),
            });

            let text = self.speak(index).await?;
            let terminated = self.is_termination(&text);
            events.push(SessionEvent::Output {
                round: rounds,
                speaker,
                text,
            });
            if terminated {
                break StopReason::Terminated;
            }
        };

        info!(rounds, reason = %stop_reason, "Group session finished");
        events.push(SessionEvent::Stopped {
            reason: stop_reason,
            rounds,
        });

        Ok(GroupChatResult {
            transcript: self.transcript[start..].to_vec(),
            events,
            rounds,
            stop_reason,
        })
    }

    pub async fn chat(&mut self, message: &str) -> Result<String, Error> {
        let result = self.chat_session(message).await?;
        Ok(normalize(result.events))
    }

    /// Drop the transcript and give every member a fresh thread.
    pub fn reset(&mut self) {
        for member in &mut self.members {
            member.thread = member.handle.create_thread();
            member.cursor = 0;
        }
        self.transcript.clear();
        self.last_speaker = None;
    }

    fn is_termination(&self, text: &str) -> bool {
        !self.termination_token.is_empty() && text.contains(&self.termination_token)
    }

    async fn speak(&mut self, index: usize) -> Result<String, Error> {
        let member = &mut self.members[index];
        let unseen = &self.transcript[member.cursor..];
        let input = if unseen.is_empty() {
            CONTINUE_PROMPT.to_string()
        } else {
            format_entries(unseen)
        };

        let reply = member.handle.send(&mut member.thread, &input, self.options).await?;
        let text = reply.message.content;
        self.transcript.push(TranscriptEntry::new(member.handle.name(), text.clone()));
        member.cursor = self.transcript.len();
        Ok(text)
    }

    async fn select_speaker(&self, task: &str) -> Result<Option<usize>, Error> {
        if let Some(selector) = &self.selector {
            let Some(name) = selector(&self.transcript, &self.roster) else {
                return Ok(None);
            };
            return match self.roster.iter().position(|n| *n == name) {
                Some(index) => Ok(Some(index)),
                None => Err(WorkflowError::UnknownSpeaker {
                    name,
                    roster: self.roster.clone(),
                }
                .into()),
            };
        }

        let mut thread = self.manager.create_thread();
        let reply = self
            .manager
            .send(&mut thread, &self.selection_prompt(task), self.options)
            .await?;

        Ok(Some(match match_speaker(reply.text(), &self.roster) {
            Some(index) => index,
            None => {
                let next = self.last_speaker.map_or(0, |i| (i + 1) % self.members.len());
                warn!(
                    reply = %reply.text(),
                    fallback = %self.roster[next],
                    "Manager reply names no roster member, using round-robin"
                );
                next
            }
        }))
    }

    fn selection_prompt(&self, task: &str) -> String {
        let participants: Vec<String> = self
            .members
            .iter()
            .map(|m| match m.handle.description() {
                "" => format!("- {}", m.handle.name()),
                description => format!("- {}: {description}", m.handle.name()),
            })
            .collect();

        format!(
            "Task: {task}\n\nParticipants:\n{}\n\nConversation so far:\n{}\n\n\
             Reply with the name of the next speaker only.",
            participants.join("\n"),
            format_entries(&self.transcript),
        )
    }
}

fn format_entries(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}: {}", e.speaker, e.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Map a manager reply onto a roster index.
fn match_speaker(reply: &str, roster: &[String]) -> Option<usize> {
    let bare = reply.trim().trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
    if let Some(index) = roster.iter().position(|name| name == bare) {
        return Some(index);
    }

    roster
        .iter()
        .enumerate()
        .filter_map(|(index, name)| reply.find(name.as_str()).map(|at| (at, std::cmp::Reverse(name.len()), index)))
        .min()
        .map(|(_, _, index)| index)
}

impl std::fmt::Debug for MultiAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiAssistant")
            .field("roster", &self.roster)
            .field("manager", &self.manager.name())
            .field("custom_selector", &self.selector.is_some())
            .field("transcript_len", &self.transcript.len())
            .field("max_rounds", &self.max_rounds)
            .field("termination_token", &self.termination_token)
            .finish()
    }
}

#[async_trait]
impl Workflow for MultiAssistant {
    fn name(&self) -> &str {
        "group"
    }

    async fn chat(&mut self, message: &str) -> Result<String, Error> {
        MultiAssistant::chat(self, message).await
    }

    fn reset(&mut self) {
        MultiAssistant::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_helpers::ScriptedBackend;
    use std::sync::Arc;

    const ROSTER: [&str; 3] = ["Data_Analyst", "Statistician", "Accountant"];

    fn group(backend: Arc<ScriptedBackend>, max_rounds: u32) -> MultiAssistant {
        let roster = ROSTER
            .iter()
            .map(|name| AgentHandle::new(*name, "", None, backend.clone()).with_description(format!("{name} persona")))
            .collect();
        let manager = AgentHandle::new(MANAGER_NAME, "Pick.", None, backend);
        let settings = WorkflowSettings::default().with_max_rounds(max_rounds);
        MultiAssistant::new(roster, manager, &settings).unwrap()
    }

    fn cycle(transcript: &[TranscriptEntry], roster: &[String]) -> Option<String> {
        let spoken = transcript.iter().filter(|e| e.speaker != USER_SPEAKER).count();
        Some(roster[spoken % roster.len()].clone())
    }

    #[tokio::test]
    async fn round_budget_is_a_hard_bound() {
        let backend = Arc::new(ScriptedBackend::new(Vec::<String>::new()).with_default("still working"));
        let mut workflow = group(backend.clone(), 3).with_selector(cycle);

        let result = workflow.chat_session("analyze").await.unwrap();
        assert_eq!(result.rounds, 3);
        assert_eq!(result.stop_reason, StopReason::MaxRounds);
        assert_eq!(backend.calls().len(), 3);
        assert_eq!(result.transcript.len(), 4);
    }

    #[tokio::test]
    async fn termination_token_ends_session() {
        let backend = Arc::new(ScriptedBackend::new(["mean is 4", "variance is 2. TERMINATE"]));
        let mut workflow = group(backend.clone(), 10).with_selector(cycle);

        let result = workflow.chat_session("stats please").await.unwrap();
        assert_eq!(result.rounds, 2);
        assert_eq!(result.stop_reason, StopReason::Terminated);
        assert_eq!(result.text(), "mean is 4\n\nvariance is 2. TERMINATE");
    }

    #[tokio::test]
    async fn speakers_receive_only_unseen_entries() {
        let backend = Arc::new(ScriptedBackend::new(["a1", "s1", "c1", "a2"]));
        let mut workflow = group(backend.clone(), 4).with_selector(cycle);
        workflow.chat("task").await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls[0].agent, "Data_Analyst");
        assert_eq!(calls[0].input, "user: task");
        assert_eq!(calls[1].input, "user: task\n\nData_Analyst: a1");
        assert_eq!(calls[2].input, "user: task\n\nData_Analyst: a1\n\nStatistician: s1");
        assert_eq!(calls[3].agent, "Data_Analyst");
        assert_eq!(calls[3].input, "Statistician: s1\n\nAccountant: c1");
        assert_eq!(calls[3].history_len, 2);
        assert_eq!(calls[3].thread_id, calls[0].thread_id);
    }

    #[tokio::test]
    async fn declining_selector_ends_session() {
        let backend = Arc::new(ScriptedBackend::new(Vec::<String>::new()));
        let mut workflow = group(backend.clone(), 5).with_selector(|_, _| None);

        assert_eq!(workflow.chat("task").await.unwrap(), "Workflow completed with events: started, stopped");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn selector_naming_outsider_is_an_error() {
        let backend = Arc::new(ScriptedBackend::new(Vec::<String>::new()));
        let mut workflow = group(backend, 5).with_selector(|_, _| Some("Trader".into()));

        let err = workflow.chat("task").await.unwrap_err();
        assert!(matches!(err, Error::Workflow(WorkflowError::UnknownSpeaker { ref name, .. }) if name == "Trader"));
    }

    #[tokio::test]
    async fn manager_picks_speaker_on_fresh_threads() {
        let backend = Arc::new(ScriptedBackend::new([
            "Statistician",
            "sample size is 30",
            "I think the Accountant should go next.",
            "books balance TERMINATE",
        ]));
        let mut workflow = group(backend.clone(), 10);

        let result = workflow.chat_session("audit the sample").await.unwrap();
        assert_eq!(result.rounds, 2);

        let calls = backend.calls();
        assert_eq!(calls[0].agent, MANAGER_NAME);
        assert_eq!(calls[0].history_len, 0);
        assert!(calls[0].input.contains("Task: audit the sample"));
        assert!(calls[0].input.contains("- Statistician: Statistician persona"));
        assert_eq!(calls[1].agent, "Statistician");
        assert_eq!(calls[2].history_len, 0);
        assert_ne!(calls[2].thread_id, calls[0].thread_id);
        assert!(calls[2].input.contains("Statistician: sample size is 30"));
        assert_eq!(calls[3].agent, "Accountant");
    }

    #[tokio::test]
    async fn unmatched_manager_reply_falls_back_to_round_robin() {
        let backend = Arc::new(ScriptedBackend::new(["nobody", "first", "still nobody", "second"]));
        let mut workflow = group(backend.clone(), 2);
        workflow.chat("task").await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls[1].agent, "Data_Analyst");
        assert_eq!(calls[3].agent, "Statistician");
    }

    #[tokio::test]
    async fn transport_error_propagates() {
        let backend = Arc::new(ScriptedBackend::new(["a1"]).fail_on(1));
        let mut workflow = group(backend, 3).with_selector(cycle);
        assert!(matches!(workflow.chat("task").await, Err(Error::Provider(_))));
    }

    #[tokio::test]
    async fn reset_clears_transcript_and_member_threads() {
        let backend = Arc::new(ScriptedBackend::new(Vec::<String>::new()).with_default("ok"));
        let mut workflow = group(backend.clone(), 1).with_selector(cycle);

        workflow.chat("first").await.unwrap();
        assert_eq!(workflow.transcript().len(), 2);
        assert_eq!(workflow.member_thread("Data_Analyst").unwrap().len(), 2);

        workflow.reset();
        assert!(workflow.transcript().is_empty());
        assert!(workflow.member_thread("Data_Analyst").unwrap().is_empty());

        workflow.chat("second").await.unwrap();
        let last = backend.calls().pop().unwrap();
        assert_eq!(last.history_len, 0);
        assert_eq!(last.input, "user: second");
    }

    #[test]
    fn empty_roster_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new(Vec::<String>::new()));
        let manager = AgentHandle::new(MANAGER_NAME, "", None, backend);
        let err = MultiAssistant::new(vec![], manager, &WorkflowSettings::default()).err().unwrap();
        assert!(matches!(err, Error::Workflow(WorkflowError::EmptyRoster)));
    }

    #[test]
    fn zero_round_budget_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new(Vec::<String>::new()));
        let member = AgentHandle::new("Data_Analyst", "", None, backend.clone());
        let manager = AgentHandle::new(MANAGER_NAME, "", None, backend.clone());
        let settings = WorkflowSettings::default().with_max_rounds(0);

        let err = MultiAssistant::new(vec![member], manager, &settings).err().unwrap();
        assert!(matches!(err, Error::Config(ConfigurationError::Invalid(_))));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn speaker_matching() {
        let roster: Vec<String> = ["Analyst", "Data_Analyst", "Accountant"].map(String::from).to_vec();
        assert_eq!(match_speaker("  Accountant. ", &roster), Some(2));
        assert_eq!(match_speaker("Data_Analyst", &roster), Some(1));
        assert_eq!(match_speaker("Next: Data_Analyst, then Accountant", &roster), Some(1));
        assert_eq!(match_speaker("Accountant, then Analyst", &roster), Some(2));
        assert_eq!(match_speaker("no idea", &roster), None);
    }
}
