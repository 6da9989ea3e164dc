//! Per-message grouping contexts handed to the presentation layer.

use crate::partition::{RenderPath, SubscriptionPartitioner};
use crate::render_sync::RenderSyncInput;
use crate::ui_state::TurnUiStore;
use chamber_core::phase::is_turn_working;
use chamber_core::{
    ActivityOptions, DiffStats, LifecycleOverrides, PhaseTracker, SessionActivity, SessionMessage,
    StreamPhase, Timeline, TurnActivityInfo, TurnActivityPart, TurnIndex,
};
use chamber_runtime_config::DisplaySettings;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Everything an assistant message needs to render its slot in a turn group.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnGroupingContext {
    pub turn_id: String,
    pub message_id: String,
    pub is_first_assistant_in_turn: bool,
    pub is_last_assistant_in_turn: bool,
    pub activity: Arc<TurnActivityInfo>,
    pub is_working: bool,
    pub is_group_expanded: bool,
    pub previewed_part_ids: BTreeSet<String>,
    pub render_path: RenderPath,
    pub phase: StreamPhase,
}

impl TurnGroupingContext {
    pub fn summary_body(&self) -> Option<&str> {
        self.activity.summary_body.as_deref()
    }

    pub fn activity_parts(&self) -> &[TurnActivityPart] {
        &self.activity.activity_parts
    }

    pub fn has_tools(&self) -> bool {
        self.activity.has_tools
    }

    pub fn has_reasoning(&self) -> bool {
        self.activity.has_reasoning
    }

    pub fn diff_stats(&self) -> Option<DiffStats> {
        self.activity.diff_stats
    }

    /// Flip the owning turn's expansion. Returns the new value; contexts
    /// produced earlier keep the value they were built with.
    pub fn toggle_group(&self, view: &mut ConversationView) -> bool {
        view.ui.toggle(&self.turn_id)
    }

    pub fn mark_parts_previewed<I, S>(&self, view: &mut ConversationView, part_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        view.ui.mark_previewed(&self.turn_id, part_ids);
    }
}

/// Long-lived state behind one rendered conversation.
#[derive(Debug, Clone)]
pub struct ConversationView {
    settings: DisplaySettings,
    ui: TurnUiStore,
    partitioner: SubscriptionPartitioner,
    phases: PhaseTracker,
    overrides: LifecycleOverrides,
    seen_identity: Option<u64>,
}

impl ConversationView {
    pub fn new(settings: &DisplaySettings) -> Self {
        let options = ActivityOptions {
            include_justification: settings.show_text_justification_activity,
        };
        Self {
            settings: settings.clone(),
            ui: TurnUiStore::new(settings.tool_call_expansion),
            partitioner: SubscriptionPartitioner::new(options),
            phases: PhaseTracker::default(),
            overrides: LifecycleOverrides::default(),
            seen_identity: None,
        }
    }

    pub fn overrides_mut(&mut self) -> &mut LifecycleOverrides {
        &mut self.overrides
    }

    pub fn ui_store(&self) -> &TurnUiStore {
        &self.ui
    }

    pub fn partitioner(&self) -> &SubscriptionPartitioner {
        &self.partitioner
    }

    /// One context per assistant message, in timeline order.
    pub fn grouping_contexts(
        &mut self,
        timeline: &Timeline,
        session: &SessionActivity,
    ) -> Vec<TurnGroupingContext> {
        let index = TurnIndex::build(timeline.messages());

        if self.seen_identity != Some(timeline.identity()) {
            self.seen_identity = Some(timeline.identity());
            let present = |id: &str| index.turn_for_message(id).is_some();
            self.phases.retain(present);
            self.overrides.retain(present);
        }
        self.partitioner.sync(timeline, &index);

        let mut contexts = Vec::new();
        for turn in index.turns() {
            let Some(activity) = self.partitioner.activity(turn.turn_id) else {
                debug!(turn_id = turn.turn_id, "turn missing from both render paths");
                continue;
            };
            let render_path = self.partitioner.path_for_turn(turn.turn_id);
            let is_working = is_turn_working(&index, turn.turn_id, session);
            let ui = self.ui.get(turn.turn_id).clone();
            let last = turn.assistant_messages.len().saturating_sub(1);

            for (position, message) in turn.assistant_messages.iter().enumerate() {
                let phase = self.phases.resolve(&message.info, session, &self.overrides);
                contexts.push(TurnGroupingContext {
                    turn_id: turn.turn_id.to_string(),
                    message_id: message.id().to_string(),
                    is_first_assistant_in_turn: position == 0,
                    is_last_assistant_in_turn: position == last,
                    activity: Arc::clone(&activity),
                    is_working,
                    is_group_expanded: ui.is_expanded,
                    previewed_part_ids: ui.previewed_part_ids.clone(),
                    render_path,
                    phase,
                });
            }
        }
        contexts
    }

    /// Render-sync input for `message` using the context built for it.
    pub fn render_sync_input<'a>(
        &self,
        message: &'a SessionMessage,
        context: &TurnGroupingContext,
    ) -> RenderSyncInput<'a> {
        RenderSyncInput::from_message(
            message,
            &context.activity,
            context.phase,
            self.settings.animate_messages,
        )
    }
}
