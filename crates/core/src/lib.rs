pub mod activity;
pub mod message;
pub mod phase;
pub mod timeline;
pub mod turn_index;

pub use activity::{ActivityKind, ActivityOptions, DiffStats, TurnActivityInfo, TurnActivityPart};
pub use message::*;
pub use phase::{LifecycleOverrides, PhaseTracker, SessionActivity, StreamPhase};
pub use timeline::{Timeline, TimelineUpdate, UpdateEffect};
pub use turn_index::{Turn, TurnIndex};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
