//! The processor's closed lifecycle state set.
//!
//! Lives here rather than in `offload-lifecycle` so
//! `ProcessorObserver::state_transition` can name it without
//! `offload-core` depending on the crate that owns the state machine
//! itself — that dependency runs the other way.

/// One of the five states spec.md §4.1 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Draining = 3,
    Stopping = 4,
}
