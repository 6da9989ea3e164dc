//! Presentation-side state for conversation views: per-turn UI state, the
//! static/dynamic render split and the streaming render-sync protocol.

pub mod grouping;
pub mod partition;
pub mod render_sync;
pub mod ui_state;

pub use grouping::{ConversationView, TurnGroupingContext};
pub use partition::{PartitionStats, RenderPath, SubscriptionPartitioner};
pub use render_sync::{
    FrameScheduler, FrameToken, NoFrameScheduler, NoSizeObserver, ObserverHandle,
    RenderSyncCoordinator, RenderSyncInput, RenderSyncSink, ReservationState, SizeObserver,
    SyncEvent,
};
pub use ui_state::{TurnUiState, TurnUiStore};
