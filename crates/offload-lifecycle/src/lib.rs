//! The processor's lifecycle state machine, isolated in its own crate
//! so it can be unit-tested without pulling in the reactor or transport.

mod state;

pub use offload_core::LifecycleState;
pub use state::{LifecycleEvent, LifecycleManager, StateError};
