//! Per-turn activity aggregation.
//!
//! Everything here is a pure function of a [`Turn`]: re-running it on the same
//! content yields equal output, including synthetic part ids.

use crate::message::{Message, Part, PartKind, SessionMessage};
use crate::turn_index::Turn;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Tool,
    Reasoning,
    /// Interim assistant text written between tool calls.
    Justification,
}

/// A tool call, reasoning block or justification surfaced as turn progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnActivityPart {
    pub id: String,
    pub turn_id: String,
    pub message_id: String,
    pub kind: ActivityKind,
    pub part: Part,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub additions: i64,
    pub deletions: i64,
    pub files: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityOptions {
    /// Surface interim text parts as [`ActivityKind::Justification`].
    pub include_justification: bool,
}

/// Derived activity summary of one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnActivityInfo {
    pub activity_parts: Vec<TurnActivityPart>,
    pub has_tools: bool,
    pub has_reasoning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_stats: Option<DiffStats>,
    /// Text and tool activity must be laid out together, so independent text
    /// reservation is off for this turn.
    pub is_coordinated: bool,
}

impl TurnActivityInfo {
    pub fn compute(turn: &Turn<'_>, options: ActivityOptions) -> Self {
        let activity_parts = collect_activity_parts(turn, options);
        let has_tools = turn.assistant_messages.iter().any(|m| m.has_tool_part());
        let has_reasoning = activity_parts
            .iter()
            .any(|p| p.kind == ActivityKind::Reasoning);

        Self {
            activity_parts,
            has_tools,
            has_reasoning,
            summary_body: extract_final_assistant_text(turn),
            diff_stats: diff_stats(&turn.user_message.info),
            is_coordinated: is_coordinated(turn, has_tools),
        }
    }

    pub fn tool_count(&self) -> usize {
        self.count(ActivityKind::Tool)
    }

    pub fn reasoning_count(&self) -> usize {
        self.count(ActivityKind::Reasoning)
    }

    pub fn count(&self, kind: ActivityKind) -> usize {
        self.activity_parts.iter().filter(|p| p.kind == kind).count()
    }
}

/// Text of the first assistant message in the turn that reached `stop`.
///
/// The first qualifying message wins. If its first text part is blank the turn
/// has no summary, even when a later message also stopped.
pub fn extract_final_assistant_text(turn: &Turn<'_>) -> Option<String> {
    let message = turn
        .assistant_messages
        .iter()
        .find(|m| m.reached_stop())?;
    let text = message.parts.iter().find_map(|part| match &part.kind {
        PartKind::Text { text } => Some(text.trim()),
        _ => None,
    })?;
    (!text.is_empty()).then(|| text.to_string())
}

/// Diff totals from the user message's change summary. A file counts only when
/// it has a non-zero line delta.
pub fn diff_stats(user_message: &Message) -> Option<DiffStats> {
    let mut stats = DiffStats::default();
    for diff in user_message.diffs() {
        stats.additions = stats.additions.saturating_add(diff.additions);
        stats.deletions = stats.deletions.saturating_add(diff.deletions);
        if diff.additions.saturating_add(diff.deletions) != 0 {
            stats.files += 1;
        }
    }
    (stats.files > 0).then_some(stats)
}

/// Walk assistant parts in message order, then part order.
pub fn collect_activity_parts(turn: &Turn<'_>, options: ActivityOptions) -> Vec<TurnActivityPart> {
    let mut out = Vec::new();
    let mut seen_activity = false;

    for message in &turn.assistant_messages {
        let message_stopped = message.reached_stop();
        for (ordinal, part) in message.parts.iter().enumerate() {
            let kind = match &part.kind {
                PartKind::Tool { .. } => ActivityKind::Tool,
                PartKind::Reasoning { text } if !text.trim().is_empty() => ActivityKind::Reasoning,
                // Only activity earlier in the walk opens the gate; text before
                // the first tool or reasoning part stays a plain reply.
                PartKind::Text { text }
                    if options.include_justification
                        && seen_activity
                        && !message_stopped
                        && !text.trim().is_empty() =>
                {
                    ActivityKind::Justification
                }
                _ => continue,
            };
            if kind != ActivityKind::Justification {
                seen_activity = true;
            }
            out.push(activity_part(turn.turn_id, message, ordinal, part, kind));
        }
    }

    out
}

fn activity_part(
    turn_id: &str,
    message: &SessionMessage,
    ordinal: usize,
    part: &Part,
    kind: ActivityKind,
) -> TurnActivityPart {
    TurnActivityPart {
        id: activity_part_id(message.id(), ordinal, part),
        turn_id: turn_id.to_string(),
        message_id: message.id().to_string(),
        kind,
        part: part.clone(),
        ended_at: part.tool_end_time(),
    }
}

/// The part's own id, or `{message_id}-activity-{ordinal}` when it has none.
pub fn activity_part_id(message_id: &str, ordinal: usize, part: &Part) -> String {
    if part.id.is_empty() {
        format!("{message_id}-activity-{ordinal}")
    } else {
        part.id.clone()
    }
}

fn is_coordinated(turn: &Turn<'_>, has_tools: bool) -> bool {
    has_tools
        && turn
            .assistant_messages
            .iter()
            .any(|m| m.has_text_part() || m.has_unfinished_step())
}
