//! Partition a flat message list into turns.
//!
//! A turn opens at a user message and collects every assistant message until
//! the next user message. There is no explicit close marker.

use crate::message::{Role, SessionMessage};
use std::collections::HashMap;

/// One user message and the assistant messages it provoked.
#[derive(Debug, Clone)]
pub struct Turn<'a> {
    /// Always the id of `user_message`.
    pub turn_id: &'a str,
    pub user_message: &'a SessionMessage,
    pub assistant_messages: Vec<&'a SessionMessage>,
}

impl<'a> Turn<'a> {
    fn open(user_message: &'a SessionMessage) -> Self {
        Self {
            turn_id: user_message.id(),
            user_message,
            assistant_messages: Vec::new(),
        }
    }

    /// User message first, then assistant messages in order.
    pub fn messages(&self) -> impl Iterator<Item = &'a SessionMessage> + '_ {
        std::iter::once(self.user_message).chain(self.assistant_messages.iter().copied())
    }

    pub fn first_assistant_id(&self) -> Option<&'a str> {
        self.assistant_messages.first().map(|m| m.id())
    }

    pub fn last_assistant_id(&self) -> Option<&'a str> {
        self.assistant_messages.last().map(|m| m.id())
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.messages().any(|m| m.id() == message_id)
    }
}

/// Ordered turns plus a `message id -> turn` lookup.
#[derive(Debug, Clone, Default)]
pub struct TurnIndex<'a> {
    turns: Vec<Turn<'a>>,
    by_message: HashMap<&'a str, usize>,
}

impl<'a> TurnIndex<'a> {
    /// Single left-to-right scan. Assistant messages before the first user
    /// message, and messages of any other role, belong to no turn.
    pub fn build(messages: &'a [SessionMessage]) -> Self {
        let mut turns: Vec<Turn<'a>> = Vec::new();
        let mut by_message = HashMap::with_capacity(messages.len());

        for message in messages {
            match message.info.resolved_role() {
                Role::User => {
                    by_message.insert(message.id(), turns.len());
                    turns.push(Turn::open(message));
                }
                Role::Assistant => {
                    let Some(idx) = turns.len().checked_sub(1) else {
                        continue;
                    };
                    by_message.insert(message.id(), idx);
                    turns[idx].assistant_messages.push(message);
                }
                Role::Other => {}
            }
        }

        Self { turns, by_message }
    }

    pub fn turns(&self) -> &[Turn<'a>] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turn(&self, turn_id: &str) -> Option<&Turn<'a>> {
        self.turn_for_message(turn_id)
            .filter(|turn| turn.turn_id == turn_id)
    }

    pub fn turn_for_message(&self, message_id: &str) -> Option<&Turn<'a>> {
        self.turn_position(message_id).map(|idx| &self.turns[idx])
    }

    pub fn turn_position(&self, message_id: &str) -> Option<usize> {
        self.by_message.get(message_id).copied()
    }

    /// The only turn that may still be receiving content.
    pub fn last_turn(&self) -> Option<&Turn<'a>> {
        self.turns.last()
    }

    pub fn is_last_turn(&self, turn_id: &str) -> bool {
        self.last_turn().is_some_and(|turn| turn.turn_id == turn_id)
    }

    pub fn is_in_last_turn(&self, message_id: &str) -> bool {
        !self.turns.is_empty() && self.turn_position(message_id) == Some(self.turns.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assistant, message_with_role, text_part, tool_part, user};

    #[test]
    fn empty_list_yields_empty_index() {
        let index = TurnIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.last_turn().is_none());
    }

    #[test]
    fn user_messages_open_turns_and_assistants_join_them() {
        let messages = vec![
            user("u1", &[]),
            assistant("a1", &[text_part("a1", "p", "hi")]),
            assistant("a2", &[]),
            user("u2", &[]),
            assistant("a3", &[]),
        ];
        let index = TurnIndex::build(&messages);

        assert_eq!(index.len(), 2);
        let first = &index.turns()[0];
        assert_eq!(first.turn_id, "u1");
        assert_eq!(first.user_message.id(), "u1");
        assert_eq!(first.first_assistant_id(), Some("a1"));
        assert_eq!(first.last_assistant_id(), Some("a2"));
        assert_eq!(index.turn_for_message("a3").map(|t| t.turn_id), Some("u2"));
        assert!(index.is_last_turn("u2"));
        assert!(index.is_in_last_turn("a3"));
        assert!(!index.is_in_last_turn("a1"));
    }

    #[test]
    fn leading_assistants_and_other_roles_are_dropped() {
        let messages = vec![
            assistant("a0", &[]),
            user("u1", &[]),
            message_with_role("sys", crate::Role::Other),
            assistant("a1", &[]),
        ];
        let index = TurnIndex::build(&messages);

        assert_eq!(index.len(), 1);
        assert!(index.turn_for_message("a0").is_none());
        assert!(index.turn_for_message("sys").is_none());
        assert_eq!(index.turns()[0].assistant_messages.len(), 1);
    }

    #[test]
    fn client_role_override_decides_grouping() {
        let mut queued = assistant("q", &[]);
        queued.info.client_role = Some(crate::Role::User);
        let messages = vec![user("u1", &[]), queued, assistant("a1", &[])];
        let index = TurnIndex::build(&messages);

        assert_eq!(index.len(), 2);
        assert_eq!(index.turn("q").map(|t| t.assistant_messages.len()), Some(1));
        assert!(index.turn("a1").is_none());
    }

    #[test]
    fn every_message_is_in_at_most_one_turn_after_its_user_message() {
        let messages = vec![
            assistant("a0", &[]),
            user("u1", &[]),
            assistant("a1", &[tool_part("a1", "t", None)]),
            user("u2", &[]),
            user("u3", &[]),
            assistant("a2", &[]),
            assistant("a3", &[]),
        ];
        let index = TurnIndex::build(&messages);
        let position = |id: &str| messages.iter().position(|m| m.id() == id).expect("id");

        let mut seen = std::collections::HashSet::new();
        for turn in index.turns() {
            let user_pos = position(turn.turn_id);
            for message in &turn.assistant_messages {
                assert!(seen.insert(message.id()), "{} grouped twice", message.id());
                assert!(position(message.id()) > user_pos);
            }
        }
        assert_eq!(index.turn("u2").map(|t| t.assistant_messages.len()), Some(0));
    }

    #[test]
    fn appending_an_assistant_keeps_existing_turn_ids() {
        let mut messages = vec![user("u1", &[]), assistant("a1", &[]), user("u2", &[])];
        let before: Vec<String> = TurnIndex::build(&messages)
            .turns()
            .iter()
            .map(|t| t.turn_id.to_string())
            .collect();

        messages.push(assistant("a2", &[]));
        let index = TurnIndex::build(&messages);
        let after: Vec<&str> = index.turns().iter().map(|t| t.turn_id).collect();

        assert_eq!(after, before);
        assert_eq!(index.turn("u2").map(|t| t.assistant_messages.len()), Some(1));
    }
}
