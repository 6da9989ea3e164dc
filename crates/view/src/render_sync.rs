//! Reservation and animation notifications for one rendered message.
//!
//! The host renderer pre-allocates vertical space when a message is about to
//! stream text in. This module decides when to ask for that space, when to give
//! it back, and forwards live height changes while the message animates.
//!
//! Frame scheduling and size observation are host capabilities. The host
//! reports their results back through [`RenderSyncCoordinator::on_resize`] and
//! [`RenderSyncCoordinator::on_frame`].

use chamber_core::{SessionMessage, StreamPhase, TurnActivityInfo};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(pub u64);

/// Coalesces work to the next animation frame.
pub trait FrameScheduler {
    /// Request a frame. `None` means the host has no frame scheduler and the
    /// coordinator must flush synchronously.
    fn request_frame(&mut self) -> Option<FrameToken>;
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Watches the rendered element of a message for height changes.
pub trait SizeObserver {
    /// Start observing. `None` means size observation is unavailable.
    fn observe(&mut self, message_id: &str) -> Option<ObserverHandle>;
    fn unobserve(&mut self, handle: ObserverHandle);
}

/// Receiver of the host-facing notifications.
pub trait RenderSyncSink {
    fn on_streaming_candidate(&mut self);
    fn on_reservation_cancelled(&mut self);
    fn on_reasoning_block(&mut self);
    fn on_animation_start(&mut self);
    fn on_animated_height_change(&mut self, height: f64);
}

/// Host without frame scheduling.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFrameScheduler;

impl FrameScheduler for NoFrameScheduler {
    fn request_frame(&mut self) -> Option<FrameToken> {
        None
    }

    fn cancel_frame(&mut self, _token: FrameToken) {}
}

/// Host without size observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSizeObserver;

impl SizeObserver for NoSizeObserver {
    fn observe(&mut self, _message_id: &str) -> Option<ObserverHandle> {
        None
    }

    fn unobserve(&mut self, _handle: ObserverHandle) {}
}

/// A notification, as recorded by the `Vec<SyncEvent>` sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncEvent {
    StreamingCandidate,
    ReservationCancelled,
    ReasoningBlock,
    AnimationStart,
    AnimatedHeightChange(f64),
}

impl RenderSyncSink for Vec<SyncEvent> {
    fn on_streaming_candidate(&mut self) {
        self.push(SyncEvent::StreamingCandidate);
    }

    fn on_reservation_cancelled(&mut self) {
        self.push(SyncEvent::ReservationCancelled);
    }

    fn on_reasoning_block(&mut self) {
        self.push(SyncEvent::ReasoningBlock);
    }

    fn on_animation_start(&mut self) {
        self.push(SyncEvent::AnimationStart);
    }

    fn on_animated_height_change(&mut self, height: f64) {
        self.push(SyncEvent::AnimatedHeightChange(height));
    }
}

/// Everything the protocol needs to know about a message on one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSyncInput<'a> {
    pub message_id: &'a str,
    pub is_assistant: bool,
    pub animation_enabled: bool,
    pub has_text_part: bool,
    /// The owning turn lays tool and text out together.
    pub turn_coordinated: bool,
    pub turn_has_reasoning: bool,
    /// The message will visibly animate in.
    pub animation_allowed: bool,
    /// Current element height, if the host measured it.
    pub measured_height: Option<f64>,
}

impl<'a> RenderSyncInput<'a> {
    /// Derive the input from the message, its turn and its phase. Animation is
    /// enabled only while the message is not completed.
    pub fn from_message(
        message: &'a SessionMessage,
        turn: &TurnActivityInfo,
        phase: StreamPhase,
        animate_messages: bool,
    ) -> Self {
        let animation_enabled = animate_messages && phase != StreamPhase::Completed;
        let has_text_part = message.has_text_part();
        Self {
            message_id: message.id(),
            is_assistant: message.info.is_assistant(),
            animation_enabled,
            has_text_part,
            turn_coordinated: turn.is_coordinated,
            turn_has_reasoning: turn.has_reasoning,
            animation_allowed: animation_enabled && has_text_part,
            measured_height: None,
        }
    }

    pub fn with_measured_height(mut self, height: f64) -> Self {
        self.measured_height = Some(height);
        self
    }

    pub fn is_candidate(&self) -> bool {
        self.is_assistant && self.animation_enabled && self.has_text_part && !self.turn_coordinated
    }
}

/// Reservation request and animation permission for the current message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservationState {
    #[default]
    Idle,
    Requested,
    Allowed,
    Both,
}

impl ReservationState {
    fn from_bits(requested: bool, allowed: bool) -> Self {
        match (requested, allowed) {
            (false, false) => Self::Idle,
            (true, false) => Self::Requested,
            (false, true) => Self::Allowed,
            (true, true) => Self::Both,
        }
    }

    pub fn is_requested(self) -> bool {
        matches!(self, Self::Requested | Self::Both)
    }

    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed | Self::Both)
    }

    fn with_requested(self, requested: bool) -> Self {
        Self::from_bits(requested, self.is_allowed())
    }

    fn with_allowed(self, allowed: bool) -> Self {
        Self::from_bits(self.is_requested(), allowed)
    }

    /// Height changes are forwarded while either bit is set.
    pub fn is_tracking(self) -> bool {
        self != Self::Idle
    }
}

/// Protocol state for one message id. Replaced wholesale when the id changes.
#[derive(Debug, Clone)]
struct Epoch {
    message_id: String,
    state: ReservationState,
    candidate_fired: bool,
    animation_started: bool,
    /// One-shot height report sent because no size observer exists.
    height_announced: bool,
    reasoning_at_request: bool,
    observer: Option<ObserverHandle>,
    pending_frame: Option<FrameToken>,
    pending_height: Option<f64>,
    last_height: Option<f64>,
}

impl Epoch {
    fn new(message_id: &str) -> Self {
        Self {
            message_id: message_id.to_string(),
            state: ReservationState::Idle,
            candidate_fired: false,
            animation_started: false,
            height_announced: false,
            reasoning_at_request: false,
            observer: None,
            pending_frame: None,
            pending_height: None,
            last_height: None,
        }
    }
}

/// Runs the reservation protocol for a single rendered message.
#[derive(Debug)]
pub struct RenderSyncCoordinator<F: FrameScheduler, O: SizeObserver> {
    scheduler: F,
    observer: O,
    epoch: Option<Epoch>,
}

impl<F: FrameScheduler, O: SizeObserver> RenderSyncCoordinator<F, O> {
    pub fn new(scheduler: F, observer: O) -> Self {
        Self {
            scheduler,
            observer,
            epoch: None,
        }
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn state(&self) -> ReservationState {
        self.epoch.as_ref().map_or(ReservationState::Idle, |e| e.state)
    }

    pub fn message_id(&self) -> Option<&str> {
        self.epoch.as_ref().map(|e| e.message_id.as_str())
    }

    /// Run one protocol step for the current render pass.
    pub fn update(&mut self, input: &RenderSyncInput<'_>, sink: &mut dyn RenderSyncSink) {
        if self.message_id() != Some(input.message_id) {
            self.reset(input.message_id);
        }
        let Some(epoch) = self.epoch.as_mut() else {
            return;
        };

        let candidate = input.is_candidate();
        if candidate && !epoch.candidate_fired {
            debug!(message_id = input.message_id, "streaming candidate");
            epoch.candidate_fired = true;
            epoch.reasoning_at_request = input.turn_has_reasoning;
            epoch.state = epoch.state.with_requested(true);
            sink.on_streaming_candidate();
        } else if !candidate && epoch.state.is_requested() {
            if input.turn_has_reasoning && !epoch.reasoning_at_request {
                debug!(message_id = input.message_id, "reservation yields to reasoning");
                sink.on_reasoning_block();
            } else {
                debug!(message_id = input.message_id, "reservation cancelled");
                sink.on_reservation_cancelled();
            }
            epoch.state = epoch.state.with_requested(false);
        }

        if input.animation_allowed && !epoch.animation_started {
            debug!(message_id = input.message_id, "animation start");
            epoch.animation_started = true;
            sink.on_animation_start();
        }
        epoch.state = epoch.state.with_allowed(input.animation_allowed);

        self.sync_observation(input.measured_height, sink);
    }

    /// The observed element changed height.
    pub fn on_resize(&mut self, message_id: &str, height: f64, sink: &mut dyn RenderSyncSink) {
        let Some(epoch) = self.epoch.as_mut() else {
            return;
        };
        if epoch.message_id != message_id || epoch.observer.is_none() {
            return;
        }
        if epoch.last_height == Some(height) && epoch.pending_frame.is_none() {
            return;
        }
        epoch.pending_height = Some(height);
        if epoch.pending_frame.is_some() {
            return;
        }
        match self.scheduler.request_frame() {
            Some(token) => epoch.pending_frame = Some(token),
            None => Self::flush(epoch, sink),
        }
    }

    /// A previously requested frame fired. Stale tokens are ignored.
    pub fn on_frame(&mut self, token: FrameToken, sink: &mut dyn RenderSyncSink) {
        let Some(epoch) = self.epoch.as_mut() else {
            return;
        };
        if epoch.pending_frame != Some(token) {
            trace!(?token, "stale frame ignored");
            return;
        }
        epoch.pending_frame = None;
        Self::flush(epoch, sink);
    }

    /// The rendered element went away. Protocol flags survive; observation
    /// re-arms on the next update.
    pub fn unmount(&mut self) {
        if let Some(mut epoch) = self.epoch.take() {
            self.disarm(&mut epoch);
            self.epoch = Some(epoch);
        }
    }

    fn reset(&mut self, message_id: &str) {
        if let Some(mut previous) = self.epoch.take() {
            trace!(from = %previous.message_id, to = message_id, "render sync subject changed");
            self.disarm(&mut previous);
        }
        self.epoch = Some(Epoch::new(message_id));
    }

    fn sync_observation(&mut self, measured_height: Option<f64>, sink: &mut dyn RenderSyncSink) {
        let Some(mut epoch) = self.epoch.take() else {
            return;
        };

        if !epoch.state.is_tracking() {
            self.disarm(&mut epoch);
        } else if epoch.observer.is_none() {
            epoch.observer = self.observer.observe(&epoch.message_id);
            if epoch.observer.is_none() && !epoch.height_announced {
                if let Some(height) = measured_height {
                    epoch.height_announced = true;
                    epoch.last_height = Some(height);
                    sink.on_animated_height_change(height);
                }
            }
        }

        self.epoch = Some(epoch);
    }

    fn disarm(&mut self, epoch: &mut Epoch) {
        if let Some(token) = epoch.pending_frame.take() {
            self.scheduler.cancel_frame(token);
        }
        if let Some(handle) = epoch.observer.take() {
            self.observer.unobserve(handle);
        }
        epoch.pending_height = None;
    }

    fn flush(epoch: &mut Epoch, sink: &mut dyn RenderSyncSink) {
        let Some(height) = epoch.pending_height.take() else {
            return;
        };
        if epoch.last_height == Some(height) {
            return;
        }
        epoch.last_height = Some(height);
        trace!(message_id = %epoch.message_id, height, "animated height change");
        sink.on_animated_height_change(height);
    }
}

impl<F: FrameScheduler, O: SizeObserver> Drop for RenderSyncCoordinator<F, O> {
    fn drop(&mut self) {
        if let Some(mut epoch) = self.epoch.take() {
            self.disarm(&mut epoch);
        }
    }
}
