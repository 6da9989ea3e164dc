use crate::message::{Message, Part, SessionMessage};
use tracing::{debug, trace};

/// One incremental change delivered by the session transport.
#[derive(Debug, Clone)]
pub enum TimelineUpdate {
    /// The whole list was replaced (session switch, history reload).
    Reloaded(Vec<SessionMessage>),
    /// A message was created or its metadata changed (finish, completion time).
    MessageUpserted(Message),
    /// A part was created or grew (streamed text, tool state change).
    PartUpserted(Part),
    PartRemoved { message_id: String, part_id: String },
    MessageRemoved(String),
}

/// How an applied update affected the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEffect {
    /// The list identity changed; every derivation must be redone.
    Structural,
    /// Only content inside the last turn changed.
    LastTurn,
    /// The update referenced something unknown and was dropped.
    Ignored,
}

/// The ordered message list of one session.
///
/// `identity` changes whenever the list changes shape or an earlier turn is
/// touched. `revision` changes on every applied update, so content churn inside
/// the last turn is visible without invalidating snapshots of earlier turns.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    messages: Vec<SessionMessage>,
    identity: u64,
    revision: u64,
}

impl Timeline {
    pub fn new(messages: Vec<SessionMessage>) -> Self {
        Self {
            messages,
            identity: 1,
            revision: 1,
        }
    }

    pub fn messages(&self) -> &[SessionMessage] {
        &self.messages
    }

    pub fn identity(&self) -> u64 {
        self.identity
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn message(&self, message_id: &str) -> Option<&SessionMessage> {
        self.position(message_id).map(|idx| &self.messages[idx])
    }

    pub fn apply(&mut self, update: TimelineUpdate) -> UpdateEffect {
        let effect = match update {
            TimelineUpdate::Reloaded(messages) => {
                debug!(count = messages.len(), "timeline reloaded");
                self.messages = messages;
                UpdateEffect::Structural
            }
            TimelineUpdate::MessageUpserted(info) => self.upsert_message(info),
            TimelineUpdate::PartUpserted(part) => self.upsert_part(part),
            TimelineUpdate::PartRemoved {
                message_id,
                part_id,
            } => self.remove_part(&message_id, &part_id),
            TimelineUpdate::MessageRemoved(message_id) => self.remove_message(&message_id),
        };

        match effect {
            UpdateEffect::Structural => {
                self.identity += 1;
                self.revision += 1;
            }
            UpdateEffect::LastTurn => self.revision += 1,
            UpdateEffect::Ignored => {}
        }
        trace!(?effect, identity = self.identity, revision = self.revision, "timeline update");
        effect
    }

    fn upsert_message(&mut self, info: Message) -> UpdateEffect {
        let Some(idx) = self.position(&info.id) else {
            // A new non-user message lands at the end, inside the last turn.
            let effect = if info.is_user() {
                UpdateEffect::Structural
            } else {
                self.effect_at(self.messages.len())
            };
            self.messages.push(SessionMessage::new(info, Vec::new()));
            return effect;
        };
        let role_changed = self.messages[idx].info.resolved_role() != info.resolved_role();
        let effect = if role_changed {
            UpdateEffect::Structural
        } else {
            self.effect_at(idx)
        };
        self.messages[idx].info = info;
        effect
    }

    fn upsert_part(&mut self, part: Part) -> UpdateEffect {
        let Some(idx) = self.position(&part.message_id) else {
            debug!(
                message_id = %part.message_id,
                part_id = %part.id,
                "part for unknown message ignored"
            );
            return UpdateEffect::Ignored;
        };
        let effect = self.effect_at(idx);
        let message = &mut self.messages[idx];
        // Id-less parts stream in place: the latest one of the same type is replaced.
        let slot = if part.id.is_empty() {
            message
                .parts
                .iter()
                .rposition(|p| p.id.is_empty() && p.type_tag() == part.type_tag())
        } else {
            message.part_position(&part.id)
        };
        match slot {
            Some(pos) => message.parts[pos] = part,
            None => message.parts.push(part),
        }
        effect
    }

    fn remove_message(&mut self, message_id: &str) -> UpdateEffect {
        let Some(idx) = self.position(message_id) else {
            return UpdateEffect::Ignored;
        };
        let effect = if self.messages[idx].info.is_user() {
            UpdateEffect::Structural
        } else {
            self.effect_at(idx)
        };
        self.messages.remove(idx);
        effect
    }

    fn remove_part(&mut self, message_id: &str, part_id: &str) -> UpdateEffect {
        let Some(idx) = self.position(message_id) else {
            return UpdateEffect::Ignored;
        };
        let Some(pos) = self.messages[idx].part_position(part_id) else {
            return UpdateEffect::Ignored;
        };
        let effect = self.effect_at(idx);
        self.messages[idx].parts.remove(pos);
        effect
    }

    /// Changes to non-user messages after the last user message stay inside
    /// the last turn; anything earlier invalidates the list identity.
    fn effect_at(&self, idx: usize) -> UpdateEffect {
        match self.last_turn_start() {
            Some(start) if idx >= start => UpdateEffect::LastTurn,
            _ => UpdateEffect::Structural,
        }
    }

    fn last_turn_start(&self) -> Option<usize> {
        self.messages.iter().rposition(|m| m.info.is_user())
    }

    fn position(&self, message_id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id() == message_id)
    }
}
