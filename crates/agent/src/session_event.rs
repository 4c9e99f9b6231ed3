//! Group-session events.
//!
//! `SessionEvent` records what happened during one group chat, in order:
//! who was picked each round, what they said, and why the session ended.
//! The event list is one of the shapes the response normalizer accepts.

use serde::{Deserialize, Serialize};

/// Why a group session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// An agent's reply contained the termination token.
    Terminated,
    /// The round budget was used up.
    MaxRounds,
    /// The custom selector declined to pick a speaker.
    SelectorDeclined,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Terminated => "terminated",
            Self::MaxRounds => "max_rounds",
            Self::SelectorDeclined => "selector_declined",
        })
    }
}

/// Events emitted during a group session.
///
/// - `started`: the task was posted to the roster
/// - `speaker_selected`: a speaker was picked for a round
/// - `output`: an agent's reply
/// - `stopped`: the session ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Started { task: String, roster: Vec<String> },

    SpeakerSelected { round: u32, speaker: String },

    /// An agent's reply for one round.
    Output { round: u32, speaker: String, text: String },

    Stopped { reason: StopReason, rounds: u32 },
}

impl SessionEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::SpeakerSelected { .. } => "speaker_selected",
            Self::Output { .. } => "output",
            Self::Stopped { .. } => "stopped",
        }
    }

    /// The reply text, for `output` events.
    pub fn output_text(&self) -> Option<&str> {
        match self {
            Self::Output { text, .. } => Some(text),
            _ => None,
        }
    }
}
