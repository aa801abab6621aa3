//! Scheduling of reconciliation passes

mod coordinator;
mod events;
mod scheduler;

pub use coordinator::{Activity, ActivityGuard, Coordinator};
pub use events::{
    CollectingSink, EVENT_TARGET, EventSink, FanoutSink, PassEvent, TracingSink,
};
pub use scheduler::{Scheduler, SchedulerHandle};
