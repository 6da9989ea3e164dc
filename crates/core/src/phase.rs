use crate::message::Message;
use crate::turn_index::TurnIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Lifecycle stage of a message's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPhase {
    Streaming,
    Cooldown,
    Completed,
}

impl StreamPhase {
    pub fn display(&self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Cooldown => "cooldown",
            Self::Completed => "completed",
        }
    }
}

/// Session-wide liveness signals supplied by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionActivity {
    /// The session is currently producing output.
    pub is_working: bool,
    pub streaming_message_id: Option<String>,
}

impl SessionActivity {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn streaming(message_id: impl Into<String>) -> Self {
        Self {
            is_working: true,
            streaming_message_id: Some(message_id.into()),
        }
    }

    pub fn is_streaming(&self, message_id: &str) -> bool {
        self.streaming_message_id.as_deref() == Some(message_id)
    }
}

/// Explicit per-message phase overrides set by the host.
#[derive(Debug, Clone, Default)]
pub struct LifecycleOverrides {
    phases: HashMap<String, StreamPhase>,
}

impl LifecycleOverrides {
    pub fn set(&mut self, message_id: impl Into<String>, phase: StreamPhase) {
        self.phases.insert(message_id.into(), phase);
    }

    pub fn clear(&mut self, message_id: &str) -> Option<StreamPhase> {
        self.phases.remove(message_id)
    }

    pub fn get(&self, message_id: &str) -> Option<StreamPhase> {
        self.phases.get(message_id).copied()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.phases.retain(|id, _| keep(id));
    }
}

/// Phase of `message`, in priority order: completion timestamp, explicit
/// override, live stream id. Anything else is treated as settled.
pub fn resolve_phase(
    message: &Message,
    session: &SessionActivity,
    overrides: &LifecycleOverrides,
) -> StreamPhase {
    if message.is_completed() {
        return StreamPhase::Completed;
    }
    if let Some(phase) = overrides.get(&message.id) {
        return phase;
    }
    if session.is_streaming(&message.id) {
        return StreamPhase::Streaming;
    }
    StreamPhase::Completed
}

/// Only the last turn can be working, and only while the session is.
pub fn is_turn_working(index: &TurnIndex<'_>, turn_id: &str, session: &SessionActivity) -> bool {
    session.is_working && index.is_last_turn(turn_id)
}

/// Remembers messages that were stamped complete, so a later record that
/// transiently lost its `completedAt` cannot move them back to streaming.
#[derive(Debug, Clone, Default)]
pub struct PhaseTracker {
    completed: HashSet<String>,
}

impl PhaseTracker {
    pub fn resolve(
        &mut self,
        message: &Message,
        session: &SessionActivity,
        overrides: &LifecycleOverrides,
    ) -> StreamPhase {
        if self.completed.contains(&message.id) {
            return StreamPhase::Completed;
        }
        if message.is_completed() {
            self.completed.insert(message.id.clone());
        }
        resolve_phase(message, session, overrides)
    }

    /// Drop ids that left the rendered set.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.completed.retain(|id| keep(id));
    }
}
