use std::path::PathBuf;

use anyhow::{Context, Result};
use chamber_core::{
    ActivityKind, PartKind, SessionActivity, SessionMessage, Timeline, TurnActivityPart, TurnIndex,
    parse_session_messages,
};
use chamber_runtime_config::DisplaySettings;
use chamber_view::{ConversationView, RenderPath, TurnGroupingContext};
use chrono::{DateTime, SecondsFormat};
use tracing::info;

use crate::config::load_config;
use crate::output::{
    ActivityEntry, MessageEntry, OutputFormat, TurnEntry, TurnsReport, first_line, render_json,
    render_text,
};

pub struct TurnsArgs {
    pub file: PathBuf,
    pub format: OutputFormat,
    pub streaming: Option<String>,
    pub working: bool,
    pub config: Option<PathBuf>,
}

pub fn run_turns(args: &TurnsArgs) -> Result<()> {
    let (config, _) = load_config(args.config.as_deref())?;
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let messages = parse_session_messages(&raw)
        .with_context(|| format!("Failed to parse session messages in {}", args.file.display()))?;
    info!(count = messages.len(), file = %args.file.display(), "loaded session messages");

    let session = SessionActivity {
        is_working: args.working || args.streaming.is_some(),
        streaming_message_id: args.streaming.clone(),
    };
    let report = build_report(messages, &config.display, &session);

    let rendered = match args.format {
        OutputFormat::Text => render_text(&report),
        OutputFormat::Json => render_json(&report).context("Failed to serialize report")?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

pub fn build_report(
    messages: Vec<SessionMessage>,
    settings: &DisplaySettings,
    session: &SessionActivity,
) -> TurnsReport {
    let timeline = Timeline::new(messages);
    let mut view = ConversationView::new(settings);
    let contexts = view.grouping_contexts(&timeline, session);
    let index = TurnIndex::build(timeline.messages());

    let turns = index
        .turns()
        .iter()
        .map(|turn| {
            let in_turn: Vec<&TurnGroupingContext> =
                contexts.iter().filter(|c| c.turn_id == turn.turn_id).collect();
            let activity = view.partitioner().activity(turn.turn_id).unwrap_or_default();
            let render_path = match view.partitioner().path_for_turn(turn.turn_id) {
                RenderPath::Static => "static",
                RenderPath::Dynamic => "dynamic",
            };

            TurnEntry {
                turn_id: turn.turn_id.to_string(),
                render_path,
                is_working: in_turn.first().is_some_and(|c| c.is_working),
                is_expanded: view.ui_store().is_expanded(turn.turn_id),
                is_coordinated: activity.is_coordinated,
                summary_body: activity.summary_body.clone(),
                diff_stats: activity.diff_stats,
                activity: activity.activity_parts.iter().map(activity_entry).collect(),
                assistant_messages: in_turn
                    .iter()
                    .map(|c| MessageEntry {
                        message_id: c.message_id.clone(),
                        phase: c.phase,
                        is_first_in_turn: c.is_first_assistant_in_turn,
                        is_last_in_turn: c.is_last_assistant_in_turn,
                    })
                    .collect(),
            }
        })
        .collect();

    TurnsReport {
        message_count: timeline.len(),
        turns,
    }
}

fn activity_entry(part: &TurnActivityPart) -> ActivityEntry {
    let label = match (&part.part.kind, part.kind) {
        (PartKind::Tool { tool, .. }, ActivityKind::Tool) => tool.clone(),
        _ => first_line(part.part.text().unwrap_or_default()).to_string(),
    };
    ActivityEntry {
        id: part.id.clone(),
        message_id: part.message_id.clone(),
        kind: part.kind,
        label,
        ended_at: part.ended_at.map(format_millis),
    }
}

fn format_millis(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ms.to_string())
}
