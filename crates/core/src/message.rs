use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// System notices and anything the transport adds later.
    #[serde(other)]
    Other,
}

/// Message metadata as delivered by the session transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(rename = "sessionID", alias = "sessionId", default)]
    pub session_id: String,
    #[serde(default = "default_role", deserialize_with = "lenient_role")]
    pub role: Role,
    /// Role forced by the client (e.g. a queued prompt echoed as user text).
    /// Takes precedence over `role` when present.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient"
    )]
    pub client_role: Option<Role>,
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<MessageTime>,
    /// Finish reason; absent while the message is still being produced.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient"
    )]
    pub finish: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient"
    )]
    pub summary: Option<MessageSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTime {
    #[serde(default, deserialize_with = "lenient")]
    pub created: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub completed: Option<i64>,
}

/// Per-message change summary attached to user messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    #[serde(default, deserialize_with = "lenient")]
    pub diffs: Option<Vec<FileDiff>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub file: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub additions: i64,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub deletions: i64,
}

impl Message {
    /// Role after applying the client override.
    pub fn resolved_role(&self) -> Role {
        self.client_role.unwrap_or(self.role)
    }

    pub fn is_user(&self) -> bool {
        self.resolved_role() == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.resolved_role() == Role::Assistant
    }

    pub fn created_at(&self) -> Option<i64> {
        self.time.as_ref().and_then(|t| t.created)
    }

    pub fn completed_at(&self) -> Option<i64> {
        self.time.as_ref().and_then(|t| t.completed)
    }

    /// True once the transport has stamped a positive completion time.
    pub fn is_completed(&self) -> bool {
        self.completed_at().is_some_and(|ts| ts > 0)
    }

    pub fn completed_datetime(&self) -> Option<DateTime<Utc>> {
        self.completed_at()
            .filter(|ts| *ts > 0)
            .and_then(|ts| Utc.timestamp_millis_opt(ts).single())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.finish.as_deref()
    }

    pub fn diffs(&self) -> &[FileDiff] {
        self.summary
            .as_ref()
            .and_then(|s| s.diffs.as_deref())
            .unwrap_or(&[])
    }
}

/// A unit of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "messageID", alias = "messageId", default)]
    pub message_id: String,
    #[serde(rename = "sessionID", alias = "sessionId", default)]
    pub session_id: String,
    #[serde(flatten)]
    pub kind: PartKind,
}

/// Part payload, tagged by the wire `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PartKind {
    Text {
        #[serde(default)]
        text: String,
    },
    Reasoning {
        #[serde(default)]
        text: String,
    },
    Tool {
        #[serde(
            rename = "callID",
            alias = "callId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        call_id: Option<String>,
        #[serde(default)]
        tool: String,
        #[serde(default, deserialize_with = "lenient")]
        state: Option<ToolState>,
    },
    StepStart,
    StepFinish {
        #[serde(default, deserialize_with = "lenient")]
        reason: Option<String>,
    },
    /// File, patch, snapshot, agent and any other part types.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolState {
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<ToolTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolTime {
    #[serde(default, deserialize_with = "lenient")]
    pub start: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub end: Option<i64>,
}

impl Part {
    pub fn type_tag(&self) -> &'static str {
        match self.kind {
            PartKind::Text { .. } => "text",
            PartKind::Reasoning { .. } => "reasoning",
            PartKind::Tool { .. } => "tool",
            PartKind::StepStart => "step-start",
            PartKind::StepFinish { .. } => "step-finish",
            PartKind::Other => "other",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, PartKind::Text { .. })
    }

    pub fn is_tool(&self) -> bool {
        matches!(self.kind, PartKind::Tool { .. })
    }

    pub fn is_reasoning(&self) -> bool {
        matches!(self.kind, PartKind::Reasoning { .. })
    }

    /// Text body of text and reasoning parts.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            PartKind::Text { text } | PartKind::Reasoning { text } => Some(text),
            _ => None,
        }
    }

    pub fn tool_end_time(&self) -> Option<i64> {
        match &self.kind {
            PartKind::Tool { state, .. } => state.as_ref()?.time.as_ref()?.end,
            _ => None,
        }
    }

    pub fn is_stop_finish(&self) -> bool {
        matches!(&self.kind, PartKind::StepFinish { reason } if reason.as_deref() == Some(STOP))
    }
}

pub(crate) const STOP: &str = "stop";

/// A message together with its parts, in part order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub info: Message,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl SessionMessage {
    pub fn new(info: Message, parts: Vec<Part>) -> Self {
        Self { info, parts }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn has_text_part(&self) -> bool {
        self.parts.iter().any(Part::is_text)
    }

    pub fn has_tool_part(&self) -> bool {
        self.parts.iter().any(Part::is_tool)
    }

    /// The message ended its final step: a `step-finish` part with reason
    /// `stop`, or a message-level `finish` of `stop`.
    pub fn reached_stop(&self) -> bool {
        self.info.finish_reason() == Some(STOP) || self.parts.iter().any(Part::is_stop_finish)
    }

    /// More `step-start` parts than `step-finish` parts.
    pub fn has_unfinished_step(&self) -> bool {
        let (started, finished) =
            self.parts
                .iter()
                .fold((0usize, 0usize), |(s, f), part| match part.kind {
                    PartKind::StepStart => (s + 1, f),
                    PartKind::StepFinish { .. } => (s, f + 1),
                    _ => (s, f),
                });
        started > finished
    }

    pub fn part_position(&self, part_id: &str) -> Option<usize> {
        if part_id.is_empty() {
            return None;
        }
        self.parts.iter().position(|p| p.id == part_id)
    }
}

/// Decode a list of session messages from the transport's JSON export.
pub fn parse_session_messages(json: &str) -> serde_json::Result<Vec<SessionMessage>> {
    serde_json::from_str(json)
}

// ── Lenient field decoders ──────────────────────────────────────────────

fn default_role() -> Role {
    Role::Other
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient(deserializer)?.unwrap_or(Role::Other))
}
