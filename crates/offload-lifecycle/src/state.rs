//! The processor's lifecycle state machine: a single atomic cell with
//! compare-and-swap transitions.
//!
//! Grounded on `tower_resilience_circuitbreaker::circuit::Circuit`'s
//! `Arc<AtomicU8>` + `transition_to` pattern and
//! `tower_resilience_reconnect::state::ReconnectState`'s
//! encode/decode-over-atomic convention for a small closed state enum.

pub use offload_core::LifecycleState;
use offload_core::{EventListener, EventListeners, OffloadEvent};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// `LifecycleState` itself lives in `offload-core` (so
/// `ProcessorObserver::state_transition` can name it without a circular
/// crate dependency); only the atomic encoding stays private to this
/// state machine.
fn encode(state: LifecycleState) -> u8 {
    state as u8
}

fn decode(value: u8) -> LifecycleState {
    match value {
        0 => LifecycleState::Stopped,
        1 => LifecycleState::Starting,
        2 => LifecycleState::Running,
        3 => LifecycleState::Draining,
        4 => LifecycleState::Stopping,
        _ => unreachable!("lifecycle cell holds only values written by LifecycleManager"),
    }
}

/// Raised when a transition is attempted from a state that doesn't
/// permit it. The cell is left unchanged.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cannot transition from {from:?} via {attempted}")]
pub struct StateError {
    pub from: LifecycleState,
    pub attempted: &'static str,
}

/// Fired on every successful transition.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub from: LifecycleState,
    pub to: LifecycleState,
    pub at: Instant,
}

impl OffloadEvent for LifecycleEvent {
    fn event_type(&self) -> &'static str {
        "state_transition"
    }

    fn timestamp(&self) -> Instant {
        self.at
    }
}

/// Owns the atomic lifecycle cell and notifies registered listeners of
/// every successful transition.
#[derive(Clone)]
pub struct LifecycleManager {
    cell: Arc<AtomicU8>,
    listeners: Arc<Mutex<EventListeners<LifecycleEvent>>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(AtomicU8::new(encode(LifecycleState::Stopped))),
            listeners: Arc::new(Mutex::new(EventListeners::new())),
        }
    }

    pub fn add_listener<L>(&self, listener: L)
    where
        L: EventListener<LifecycleEvent> + 'static,
    {
        self.listeners.lock().unwrap().add(listener);
    }

    pub fn state(&self) -> LifecycleState {
        decode(self.cell.load(Ordering::Acquire))
    }

    pub fn accepting_new(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    pub fn any_work_possible(&self) -> bool {
        matches!(self.state(), LifecycleState::Running | LifecycleState::Draining)
    }

    pub fn start(&self) -> Result<(), StateError> {
        self.transition(LifecycleState::Stopped, LifecycleState::Starting, "start()")
    }

    pub fn mark_running(&self) -> Result<(), StateError> {
        self.transition(LifecycleState::Starting, LifecycleState::Running, "mark_running()")
    }

    pub fn begin_drain(&self) -> Result<(), StateError> {
        self.transition(LifecycleState::Running, LifecycleState::Draining, "begin_drain()")
    }

    pub fn begin_stop(&self) -> Result<(), StateError> {
        self.transition(LifecycleState::Draining, LifecycleState::Stopping, "begin_stop()")
    }

    pub fn mark_stopped(&self) -> Result<(), StateError> {
        self.transition(LifecycleState::Stopping, LifecycleState::Stopped, "mark_stopped()")
    }

    fn transition(
        &self,
        expected: LifecycleState,
        next: LifecycleState,
        op: &'static str,
    ) -> Result<(), StateError> {
        match self.cell.compare_exchange(
            encode(expected),
            encode(next),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.listeners.lock().unwrap().emit(&LifecycleEvent {
                    from: expected,
                    to: next,
                    at: Instant::now(),
                });
                Ok(())
            }
            Err(actual) => Err(StateError {
                from: decode(actual),
                attempted: op,
            }),
        }
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_every_state_in_order() {
        let manager = LifecycleManager::new();
        assert_eq!(manager.state(), LifecycleState::Stopped);
        manager.start().unwrap();
        assert_eq!(manager.state(), LifecycleState::Starting);
        manager.mark_running().unwrap();
        assert!(manager.accepting_new());
        manager.begin_drain().unwrap();
        assert!(!manager.accepting_new());
        assert!(manager.any_work_possible());
        manager.begin_stop().unwrap();
        assert!(!manager.any_work_possible());
        manager.mark_stopped().unwrap();
        assert_eq!(manager.state(), LifecycleState::Stopped);
    }

    #[test]
    fn invalid_transition_leaves_the_cell_unchanged() {
        let manager = LifecycleManager::new();
        let err = manager.mark_running().unwrap_err();
        assert_eq!(err.from, LifecycleState::Stopped);
        assert_eq!(manager.state(), LifecycleState::Stopped);
    }

    #[test]
    fn every_transition_notifies_listeners() {
        use std::sync::atomic::AtomicUsize;
        let manager = LifecycleManager::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        manager.add_listener(offload_core::FnListener::new(move |_event: &LifecycleEvent| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        manager.start().unwrap();
        manager.mark_running().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
