//! Property 5 from spec.md §8: lifecycle transitions follow the
//! permitted DAG (`Stopped -> Starting -> Running -> Draining ->
//! Stopping -> Stopped`), and any invalid transition leaves the state
//! unchanged.
//!
//! Grounded on the same style of property test a state machine like
//! `tower-resilience-circuitbreaker`'s uses: drive random operation
//! sequences against it and check the invariant holds after each one.

use offload_lifecycle::{LifecycleManager, LifecycleState};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    MarkRunning,
    BeginDrain,
    BeginStop,
    MarkStopped,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::MarkRunning),
        Just(Op::BeginDrain),
        Just(Op::BeginStop),
        Just(Op::MarkStopped),
    ]
}

fn apply(manager: &LifecycleManager, op: Op) -> Result<(), offload_lifecycle::StateError> {
    match op {
        Op::Start => manager.start(),
        Op::MarkRunning => manager.mark_running(),
        Op::BeginDrain => manager.begin_drain(),
        Op::BeginStop => manager.begin_stop(),
        Op::MarkStopped => manager.mark_stopped(),
    }
}

/// The DAG edge each op represents, as (required-from, resulting-to).
fn permitted_edge(op: Op) -> (LifecycleState, LifecycleState) {
    match op {
        Op::Start => (LifecycleState::Stopped, LifecycleState::Starting),
        Op::MarkRunning => (LifecycleState::Starting, LifecycleState::Running),
        Op::BeginDrain => (LifecycleState::Running, LifecycleState::Draining),
        Op::BeginStop => (LifecycleState::Draining, LifecycleState::Stopping),
        Op::MarkStopped => (LifecycleState::Stopping, LifecycleState::Stopped),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn random_operation_sequences_never_leave_the_dag(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let manager = LifecycleManager::new();

        for op in ops {
            let before = manager.state();
            let (required_from, to) = permitted_edge(op);
            let result = apply(&manager, op);

            if before == required_from {
                prop_assert!(result.is_ok());
                prop_assert_eq!(manager.state(), to);
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(
                    manager.state(),
                    before,
                    "a rejected transition must leave the state unchanged"
                );
            }
        }
    }
}
