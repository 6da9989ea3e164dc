use std::fmt::Write as _;

use chamber_core::{ActivityKind, DiffStats, StreamPhase};
use serde::Serialize;

/// Output format for turn reports.
#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnsReport {
    pub message_count: usize,
    pub turns: Vec<TurnEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnEntry {
    pub turn_id: String,
    /// "static" or "dynamic".
    pub render_path: &'static str,
    pub is_working: bool,
    pub is_expanded: bool,
    pub is_coordinated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_stats: Option<DiffStats>,
    pub activity: Vec<ActivityEntry>,
    pub assistant_messages: Vec<MessageEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub message_id: String,
    pub kind: ActivityKind,
    /// Tool name, or the first line of reasoning/justification text.
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntry {
    pub message_id: String,
    pub phase: StreamPhase,
    pub is_first_in_turn: bool,
    pub is_last_in_turn: bool,
}

pub fn render_json(report: &TurnsReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

pub fn render_text(report: &TurnsReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} messages, {} turns",
        report.message_count,
        report.turns.len()
    );

    for turn in &report.turns {
        let mut flags = vec![turn.render_path];
        if turn.is_working {
            flags.push("working");
        }
        if turn.is_coordinated {
            flags.push("coordinated");
        }
        flags.push(if turn.is_expanded { "expanded" } else { "collapsed" });

        let _ = writeln!(out);
        let _ = writeln!(out, "turn {} [{}]", turn.turn_id, flags.join(", "));
        if let Some(stats) = turn.diff_stats {
            let _ = writeln!(
                out,
                "  diff: {} file(s), +{} -{}",
                stats.files, stats.additions, stats.deletions
            );
        }
        for message in &turn.assistant_messages {
            let _ = writeln!(out, "  {} {}", message.message_id, message.phase.display());
        }
        for activity in &turn.activity {
            let kind = match activity.kind {
                ActivityKind::Tool => "tool",
                ActivityKind::Reasoning => "reasoning",
                ActivityKind::Justification => "text",
            };
            let mut line = format!("    - {kind:<9} {}", activity.label);
            if activity.kind == ActivityKind::Tool {
                line.push(' ');
                line.push_str(activity.ended_at.as_deref().unwrap_or("running"));
            }
            let _ = writeln!(out, "{}", line.trim_end());
        }
        if let Some(summary) = &turn.summary_body {
            let _ = writeln!(out, "  summary: {}", first_line(summary));
        }
    }
    out
}

pub fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}
