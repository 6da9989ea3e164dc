//! Static/dynamic render split.
//!
//! Every turn but the last is settled, so its activity is computed once per
//! timeline identity and shared from a snapshot. The last turn is recomputed
//! whenever the timeline revision moves. Streaming churn therefore costs the
//! size of the active turn, not the whole conversation.

use chamber_core::{ActivityOptions, Timeline, TurnActivityInfo, TurnIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// Memoized snapshot; never recomputed by streaming updates.
    Static,
    /// Member of the last turn; follows live recomputation.
    Dynamic,
}

/// Recomputation counters, useful for asserting the cost bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionStats {
    pub snapshot_rebuilds: u64,
    pub static_computations: u64,
    pub dynamic_computations: u64,
}

#[derive(Debug, Clone)]
struct LiveTurn {
    turn_id: String,
    revision: u64,
    info: Arc<TurnActivityInfo>,
}

#[derive(Debug, Clone)]
pub struct SubscriptionPartitioner {
    options: ActivityOptions,
    snapshot_identity: Option<u64>,
    snapshot: HashMap<String, Arc<TurnActivityInfo>>,
    last_turn_id: Option<String>,
    live: Option<LiveTurn>,
    stats: PartitionStats,
}

impl SubscriptionPartitioner {
    pub fn new(options: ActivityOptions) -> Self {
        Self {
            options,
            snapshot_identity: None,
            snapshot: HashMap::new(),
            last_turn_id: None,
            live: None,
            stats: PartitionStats::default(),
        }
    }

    /// Changing options invalidates both paths.
    pub fn set_options(&mut self, options: ActivityOptions) {
        if self.options != options {
            self.options = options;
            self.invalidate();
        }
    }

    pub fn invalidate(&mut self) {
        self.snapshot_identity = None;
        self.snapshot.clear();
        self.last_turn_id = None;
        self.live = None;
    }

    pub fn stats(&self) -> PartitionStats {
        self.stats
    }

    /// Bring both paths up to date. `index` must be built from `timeline`.
    pub fn sync(&mut self, timeline: &Timeline, index: &TurnIndex<'_>) {
        if self.snapshot_identity != Some(timeline.identity()) {
            self.rebuild_snapshot(timeline.identity(), index);
        }

        let Some(last) = index.last_turn() else {
            self.live = None;
            return;
        };
        let fresh = self
            .live
            .as_ref()
            .is_some_and(|live| live.turn_id == last.turn_id && live.revision == timeline.revision());
        if fresh {
            return;
        }

        self.stats.dynamic_computations += 1;
        trace!(turn_id = last.turn_id, revision = timeline.revision(), "live turn recomputed");
        self.live = Some(LiveTurn {
            turn_id: last.turn_id.to_string(),
            revision: timeline.revision(),
            info: Arc::new(TurnActivityInfo::compute(last, self.options)),
        });
    }

    fn rebuild_snapshot(&mut self, identity: u64, index: &TurnIndex<'_>) {
        let turns = index.turns();
        let settled = turns.len().saturating_sub(1);

        self.snapshot.clear();
        for turn in &turns[..settled] {
            self.snapshot.insert(
                turn.turn_id.to_string(),
                Arc::new(TurnActivityInfo::compute(turn, self.options)),
            );
        }
        self.stats.snapshot_rebuilds += 1;
        self.stats.static_computations += settled as u64;
        self.snapshot_identity = Some(identity);
        self.last_turn_id = index.last_turn().map(|t| t.turn_id.to_string());
        self.live = None;
        debug!(identity, settled, "static turn snapshot rebuilt");
    }

    /// Render path of a message; `None` when it belongs to no turn.
    pub fn classify(&self, index: &TurnIndex<'_>, message_id: &str) -> Option<RenderPath> {
        let turn = index.turn_for_message(message_id)?;
        Some(self.path_for_turn(turn.turn_id))
    }

    pub fn path_for_turn(&self, turn_id: &str) -> RenderPath {
        if self.last_turn_id.as_deref() == Some(turn_id) {
            RenderPath::Dynamic
        } else {
            RenderPath::Static
        }
    }

    /// Activity for a turn from whichever path owns it. Call [`Self::sync`]
    /// first.
    pub fn activity(&self, turn_id: &str) -> Option<Arc<TurnActivityInfo>> {
        match self.path_for_turn(turn_id) {
            RenderPath::Dynamic => self
                .live
                .as_ref()
                .filter(|live| live.turn_id == turn_id)
                .map(|live| Arc::clone(&live.info)),
            RenderPath::Static => self.snapshot.get(turn_id).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chamber_core::testing::{assistant, text_part, tool_part, user, with_finish};
    use chamber_core::TimelineUpdate;

    fn timeline() -> Timeline {
        Timeline::new(vec![
            user("u1", &[]),
            with_finish(assistant("a1", &[text_part("a1", "p1", "one")]), "stop"),
            user("u2", &[]),
            with_finish(assistant("a2", &[text_part("a2", "p2", "two")]), "stop"),
            user("u3", &[]),
            assistant("a3", &[]),
        ])
    }

    #[test]
    fn last_turn_is_dynamic_and_others_static() {
        let timeline = timeline();
        let index = TurnIndex::build(timeline.messages());
        let mut partitioner = SubscriptionPartitioner::new(ActivityOptions::default());
        partitioner.sync(&timeline, &index);

        assert_eq!(partitioner.classify(&index, "a1"), Some(RenderPath::Static));
        assert_eq!(partitioner.classify(&index, "u2"), Some(RenderPath::Static));
        assert_eq!(partitioner.classify(&index, "u3"), Some(RenderPath::Dynamic));
        assert_eq!(partitioner.classify(&index, "a3"), Some(RenderPath::Dynamic));
        assert_eq!(partitioner.classify(&index, "missing"), None);

        assert_eq!(
            partitioner.activity("u1").and_then(|i| i.summary_body.clone()),
            Some("one".to_string())
        );
        assert!(partitioner.activity("u3").is_some());
    }

    #[test]
    fn streaming_tool_parts_only_recompute_last_turn() {
        let mut timeline = timeline();
        let mut partitioner = SubscriptionPartitioner::new(ActivityOptions::default());
        {
            let index = TurnIndex::build(timeline.messages());
            partitioner.sync(&timeline, &index);
        }
        let before = partitioner.stats();
        let settled_u1 = partitioner.activity("u1").expect("u1 snapshot");

        for n in 0..50 {
            timeline.apply(TimelineUpdate::PartUpserted(tool_part(
                "a3",
                &format!("t{n}"),
                None,
            )));
            let index = TurnIndex::build(timeline.messages());
            partitioner.sync(&timeline, &index);
        }

        let after = partitioner.stats();
        assert_eq!(after.snapshot_rebuilds, before.snapshot_rebuilds);
        assert_eq!(after.static_computations, before.static_computations);
        assert_eq!(after.dynamic_computations, before.dynamic_computations + 50);
        assert!(Arc::ptr_eq(
            &settled_u1,
            &partitioner.activity("u1").expect("u1 snapshot")
        ));
        assert_eq!(partitioner.activity("u3").map(|i| i.tool_count()), Some(50));
    }

    #[test]
    fn messages_joining_or_leaving_last_turn_keep_snapshot() {
        let mut timeline = timeline();
        let mut partitioner = SubscriptionPartitioner::new(ActivityOptions::default());
        {
            let index = TurnIndex::build(timeline.messages());
            partitioner.sync(&timeline, &index);
        }
        let before = partitioner.stats();

        for n in 0..5 {
            let id = format!("a3-{n}");
            timeline.apply(TimelineUpdate::MessageUpserted(assistant(&id, &[]).info));
            let index = TurnIndex::build(timeline.messages());
            partitioner.sync(&timeline, &index);
        }
        timeline.apply(TimelineUpdate::MessageRemoved("a3-0".into()));
        let index = TurnIndex::build(timeline.messages());
        partitioner.sync(&timeline, &index);

        let after = partitioner.stats();
        assert_eq!(after.snapshot_rebuilds, before.snapshot_rebuilds);
        assert_eq!(after.static_computations, before.static_computations);
        assert_eq!(after.dynamic_computations, before.dynamic_computations + 6);
        assert_eq!(partitioner.classify(&index, "a3-4"), Some(RenderPath::Dynamic));
        assert_eq!(partitioner.classify(&index, "a3-0"), None);
    }

    #[test]
    fn unchanged_revision_reuses_live_turn() {
        let timeline = timeline();
        let index = TurnIndex::build(timeline.messages());
        let mut partitioner = SubscriptionPartitioner::new(ActivityOptions::default());
        partitioner.sync(&timeline, &index);
        partitioner.sync(&timeline, &index);
        assert_eq!(partitioner.stats().dynamic_computations, 1);
        assert_eq!(partitioner.stats().snapshot_rebuilds, 1);
    }

    #[test]
    fn new_user_message_moves_the_boundary() {
        let mut timeline = timeline();
        let mut partitioner = SubscriptionPartitioner::new(ActivityOptions::default());
        {
            let index = TurnIndex::build(timeline.messages());
            partitioner.sync(&timeline, &index);
        }

        timeline.apply(TimelineUpdate::MessageUpserted(user("u4", &[]).info));
        let index = TurnIndex::build(timeline.messages());
        partitioner.sync(&timeline, &index);

        assert_eq!(partitioner.classify(&index, "a3"), Some(RenderPath::Static));
        assert_eq!(partitioner.classify(&index, "u4"), Some(RenderPath::Dynamic));
        assert_eq!(partitioner.stats().snapshot_rebuilds, 2);
        assert!(partitioner.activity("u3").is_some());
    }

    #[test]
    fn option_change_invalidates_snapshot() {
        let timeline = timeline();
        let index = TurnIndex::build(timeline.messages());
        let mut partitioner = SubscriptionPartitioner::new(ActivityOptions::default());
        partitioner.sync(&timeline, &index);

        partitioner.set_options(ActivityOptions {
            include_justification: true,
        });
        assert!(partitioner.activity("u1").is_none());
        partitioner.sync(&timeline, &index);
        assert_eq!(partitioner.stats().snapshot_rebuilds, 2);
    }
}
