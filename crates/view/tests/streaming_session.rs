use chamber_core::testing::{
    assistant, completed, reasoning_part, text_part, tool_part, user, with_finish,
};
use chamber_core::{SessionActivity, Timeline, TimelineUpdate};
use chamber_runtime_config::DisplaySettings;
use chamber_view::{
    ConversationView, NoFrameScheduler, NoSizeObserver, RenderPath, RenderSyncCoordinator,
    SyncEvent,
};

fn session_with_open_turn() -> Timeline {
    Timeline::new(vec![
        user("u1", &[]),
        completed(
            with_finish(assistant("a1", &[text_part("a1", "x1", "earlier")]), "stop"),
            10,
        ),
        user("u2", &[]),
        assistant("a2", &[]),
    ])
}

/// Render every assistant message once and feed `a2` through the coordinator.
fn render(
    view: &mut ConversationView,
    timeline: &Timeline,
    session: &SessionActivity,
    sync: &mut RenderSyncCoordinator<NoFrameScheduler, NoSizeObserver>,
    events: &mut Vec<SyncEvent>,
) {
    let contexts = view.grouping_contexts(timeline, session);
    let context = contexts
        .iter()
        .find(|c| c.message_id == "a2")
        .expect("a2 context");
    let message = timeline.message("a2").expect("a2 message");
    let input = view.render_sync_input(message, context).with_measured_height(24.0);
    sync.update(&input, events);
}

#[test]
fn tool_call_arriving_mid_stream_cancels_reservation() {
    let mut timeline = session_with_open_turn();
    let mut view = ConversationView::new(&DisplaySettings::default());
    let mut sync = RenderSyncCoordinator::new(NoFrameScheduler, NoSizeObserver);
    let mut events = Vec::new();
    let session = SessionActivity::streaming("a2");

    render(&mut view, &timeline, &session, &mut sync, &mut events);
    assert!(events.is_empty());

    timeline.apply(TimelineUpdate::PartUpserted(text_part("a2", "x2", "Let me")));
    render(&mut view, &timeline, &session, &mut sync, &mut events);
    assert_eq!(
        events,
        vec![
            SyncEvent::StreamingCandidate,
            SyncEvent::AnimationStart,
            SyncEvent::AnimatedHeightChange(24.0),
        ]
    );

    timeline.apply(TimelineUpdate::PartUpserted(tool_part("a2", "t1", None)));
    render(&mut view, &timeline, &session, &mut sync, &mut events);
    assert_eq!(events.last(), Some(&SyncEvent::ReservationCancelled));

    let mut done = completed(assistant("a2", &[]), 50).info;
    done.finish = Some("stop".to_string());
    timeline.apply(TimelineUpdate::MessageUpserted(done));
    render(&mut view, &timeline, &SessionActivity::idle(), &mut sync, &mut events);
    assert_eq!(events.len(), 4);
    assert!(!sync.state().is_tracking());
}

#[test]
fn reasoning_arriving_mid_stream_blocks_reservation() {
    let mut timeline = session_with_open_turn();
    let mut view = ConversationView::new(&DisplaySettings::default());
    let mut sync = RenderSyncCoordinator::new(NoFrameScheduler, NoSizeObserver);
    let mut events = Vec::new();
    let session = SessionActivity::streaming("a2");

    timeline.apply(TimelineUpdate::PartUpserted(text_part("a2", "x2", "Looking")));
    render(&mut view, &timeline, &session, &mut sync, &mut events);

    timeline.apply(TimelineUpdate::PartUpserted(reasoning_part("a2", "r1", "hmm")));
    timeline.apply(TimelineUpdate::PartUpserted(tool_part("a2", "t1", None)));
    render(&mut view, &timeline, &session, &mut sync, &mut events);

    assert_eq!(events.first(), Some(&SyncEvent::StreamingCandidate));
    assert_eq!(events.last(), Some(&SyncEvent::ReasoningBlock));
    assert!(!events.contains(&SyncEvent::ReservationCancelled));
}

#[test]
fn animations_disabled_never_reserve() {
    let mut timeline = session_with_open_turn();
    let settings = DisplaySettings {
        animate_messages: false,
        ..DisplaySettings::default()
    };
    let mut view = ConversationView::new(&settings);
    let mut sync = RenderSyncCoordinator::new(NoFrameScheduler, NoSizeObserver);
    let mut events = Vec::new();

    timeline.apply(TimelineUpdate::PartUpserted(text_part("a2", "x2", "quiet")));
    render(
        &mut view,
        &timeline,
        &SessionActivity::streaming("a2"),
        &mut sync,
        &mut events,
    );
    assert!(events.is_empty());
}

#[test]
fn streaming_cost_is_bounded_by_the_active_turn() {
    let mut messages = Vec::new();
    for n in 0..40 {
        let uid = format!("u{n}");
        let aid = format!("a{n}");
        messages.push(user(&uid, &[]));
        messages.push(completed(
            with_finish(
                assistant(&aid, &[text_part(&aid, &format!("{aid}-x"), "ok")]),
                "stop",
            ),
            n + 1,
        ));
    }
    messages.push(user("live-u", &[]));
    messages.push(assistant("live-a", &[]));
    let mut timeline = Timeline::new(messages);

    let mut view = ConversationView::new(&DisplaySettings::default());
    let session = SessionActivity::streaming("live-a");
    view.grouping_contexts(&timeline, &session);
    let baseline = view.partitioner().stats();
    assert_eq!(baseline.static_computations, 40);

    for n in 0..50 {
        timeline.apply(TimelineUpdate::PartUpserted(tool_part(
            "live-a",
            &format!("t{n}"),
            None,
        )));
        let contexts = view.grouping_contexts(&timeline, &session);
        let live = contexts.last().expect("live context");
        assert_eq!(live.render_path, RenderPath::Dynamic);
        assert_eq!(live.activity_parts().len(), n + 1);
    }

    let stats = view.partitioner().stats();
    assert_eq!(stats.static_computations, baseline.static_computations);
    assert_eq!(stats.snapshot_rebuilds, baseline.snapshot_rebuilds);
    assert_eq!(stats.dynamic_computations, baseline.dynamic_computations + 50);
}

#[test]
fn new_agent_steps_do_not_recompute_settled_turns() {
    let mut messages = Vec::new();
    for n in 0..10 {
        let uid = format!("u{n}");
        let aid = format!("a{n}");
        messages.push(user(&uid, &[]));
        messages.push(completed(
            with_finish(
                assistant(&aid, &[text_part(&aid, &format!("{aid}-x"), "ok")]),
                "stop",
            ),
            n + 1,
        ));
    }
    messages.push(user("live-u", &[]));
    let mut timeline = Timeline::new(messages);

    let mut view = ConversationView::new(&DisplaySettings::default());
    let session = SessionActivity {
        is_working: true,
        streaming_message_id: None,
    };
    view.grouping_contexts(&timeline, &session);
    let baseline = view.partitioner().stats();
    assert_eq!(baseline.static_computations, 10);

    for step in 0..5 {
        let id = format!("step-{step}");
        timeline.apply(TimelineUpdate::MessageUpserted(assistant(&id, &[]).info));
        timeline.apply(TimelineUpdate::PartUpserted(tool_part(&id, &format!("{id}-t"), None)));
        let contexts = view.grouping_contexts(&timeline, &session);
        let live: Vec<_> = contexts.iter().filter(|c| c.turn_id == "live-u").collect();
        assert_eq!(live.len(), step + 1);
        assert_eq!(live[0].activity_parts().len(), step + 1);
    }
    timeline.apply(TimelineUpdate::MessageRemoved("step-0".into()));
    let contexts = view.grouping_contexts(&timeline, &session);
    assert_eq!(contexts.iter().filter(|c| c.turn_id == "live-u").count(), 4);

    let stats = view.partitioner().stats();
    assert_eq!(stats.static_computations, baseline.static_computations);
    assert_eq!(stats.snapshot_rebuilds, baseline.snapshot_rebuilds);
}
