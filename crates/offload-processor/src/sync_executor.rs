//! `SynchronousExecutor` — runs tasks inline, no queue, no background
//! reactor. Exists for tests and for callers spec.md §9 calls out as
//! wanting deterministic, synchronous dispatch instead of the real
//! concurrent engine.

use crate::execute::{execute_one, ExecutionContext};
use offload_core::RequestTask;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Executes every enqueued task immediately, on the calling task,
/// before `enqueue` returns. Admission control and queueing don't
/// apply — there's nothing to be admitted into.
#[derive(Clone)]
pub struct SynchronousExecutor {
    ctx: ExecutionContext,
    next_id: Arc<AtomicU64>,
}

impl SynchronousExecutor {
    pub fn new(ctx: ExecutionContext) -> Self {
        Self {
            ctx,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Runs `task` to completion and dispatches its outcome before
    /// returning.
    pub async fn enqueue(&self, task: RequestTask) {
        let task_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        execute_one(task, &self.ctx, Arc::new(AtomicBool::new(false)), task_id).await;
    }
}
