use crate::{
    FileDiff, Message, MessageSummary, MessageTime, Part, PartKind, Role, SessionMessage, ToolState,
    ToolTime,
};

/// Message with the given role and no parts.
pub fn message_with_role(id: &str, role: Role) -> SessionMessage {
    SessionMessage::new(
        Message {
            id: id.to_string(),
            session_id: "ses_test".to_string(),
            role,
            client_role: None,
            time: Some(MessageTime {
                created: Some(next_created()),
                completed: None,
            }),
            finish: None,
            summary: None,
        },
        Vec::new(),
    )
}

/// User message with the given parts.
pub fn user(id: &str, parts: &[Part]) -> SessionMessage {
    with_parts(message_with_role(id, Role::User), parts)
}

/// Assistant message with the given parts, still in progress.
pub fn assistant(id: &str, parts: &[Part]) -> SessionMessage {
    with_parts(message_with_role(id, Role::Assistant), parts)
}

pub fn with_finish(mut message: SessionMessage, reason: &str) -> SessionMessage {
    message.info.finish = Some(reason.to_string());
    message
}

pub fn completed(mut message: SessionMessage, completed_at: i64) -> SessionMessage {
    message.info.time.get_or_insert_with(MessageTime::default).completed = Some(completed_at);
    message
}

/// Attach `(file, additions, deletions)` diffs to a (user) message.
pub fn with_diffs(mut message: SessionMessage, diffs: &[(&str, i64, i64)]) -> SessionMessage {
    message.info.summary = Some(MessageSummary {
        diffs: Some(
            diffs
                .iter()
                .map(|(file, additions, deletions)| FileDiff {
                    file: file.to_string(),
                    additions: *additions,
                    deletions: *deletions,
                })
                .collect(),
        ),
    });
    message
}

pub fn text_part(message_id: &str, part_id: &str, text: &str) -> Part {
    part(
        message_id,
        part_id,
        PartKind::Text {
            text: text.to_string(),
        },
    )
}

pub fn reasoning_part(message_id: &str, part_id: &str, text: &str) -> Part {
    part(
        message_id,
        part_id,
        PartKind::Reasoning {
            text: text.to_string(),
        },
    )
}

/// Tool part; `ended_at` set means the call finished.
pub fn tool_part(message_id: &str, part_id: &str, ended_at: Option<i64>) -> Part {
    part(
        message_id,
        part_id,
        PartKind::Tool {
            call_id: Some(format!("call-{part_id}")),
            tool: "bash".to_string(),
            state: Some(ToolState {
                status: Some(if ended_at.is_some() { "completed" } else { "running" }.to_string()),
                time: Some(ToolTime {
                    start: Some(1),
                    end: ended_at,
                }),
            }),
        },
    )
}

pub fn step_start(message_id: &str, part_id: &str) -> Part {
    part(message_id, part_id, PartKind::StepStart)
}

pub fn step_finish(message_id: &str, part_id: &str, reason: &str) -> Part {
    part(
        message_id,
        part_id,
        PartKind::StepFinish {
            reason: Some(reason.to_string()),
        },
    )
}

fn part(message_id: &str, part_id: &str, kind: PartKind) -> Part {
    Part {
        id: part_id.to_string(),
        message_id: message_id.to_string(),
        session_id: "ses_test".to_string(),
        kind,
    }
}

fn with_parts(mut message: SessionMessage, parts: &[Part]) -> SessionMessage {
    message.parts = parts.to_vec();
    message
}

fn next_created() -> i64 {
    use std::sync::atomic::{AtomicI64, Ordering};
    static COUNTER: AtomicI64 = AtomicI64::new(1_700_000_000_000);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
