//! `Processor` — the bounded-queue, semaphore-gated reactor.
//!
//! Grounded on `tower_resilience_bulkhead::service::BulkheadService`'s
//! `Arc<Semaphore>`-gated admission (capacity is the number of permits,
//! not a counter that can race), generalized with a bounded `mpsc`
//! queue in front of it per spec.md §4.3/§5.

use crate::execute::{execute_one, ExecutionContext};
use offload_client::ClientPool;
use offload_core::{EventListener, ProcessorObserver, RequestTask};
use offload_lifecycle::{LifecycleEvent, LifecycleManager, LifecycleState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify, Semaphore};

/// The two producer-side errors spec.md §7 names (`MaxCapacityError`,
/// `NotRunningError`), raised synchronously from [`Processor::enqueue`]
/// rather than delivered through a task handler — unlike every
/// execution-side failure, which is always async and always goes to
/// `on_error`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnqueueError {
    #[error("queue is at capacity")]
    MaxCapacity,
    #[error("processor is not accepting new requests in its current state")]
    NotRunning,
}

/// Tasks that have been handed a permit and are actually running, keyed
/// so a task can be marked abandoned and handed back to its handler's
/// `retry` if the drain deadline passes before it finishes. The flag is
/// checked by `execute_one` itself — the task is never aborted, only
/// told its eventual outcome won't be delivered, per spec.md §5.
type InFlightRegistry = Arc<Mutex<HashMap<u64, (Arc<AtomicBool>, RequestTask)>>>;

/// Forwards every successful `LifecycleManager` transition to the
/// processor's `ProcessorObserver`, translating the closed five-state
/// machine into spec.md §4.7's `started`/`stopped`/`state_transition`
/// signals. Registered once, in `Processor::spawn`, via
/// `LifecycleManager::add_listener`.
struct ObserverLifecycleBridge {
    observer: Arc<dyn ProcessorObserver>,
}

impl EventListener<LifecycleEvent> for ObserverLifecycleBridge {
    fn on_event(&self, event: &LifecycleEvent) {
        self.observer.state_transition(event.from, event.to);
        match event.to {
            LifecycleState::Running => self.observer.started(),
            LifecycleState::Stopped => self.observer.stopped(),
            _ => {}
        }
    }
}

struct Inner {
    sender: mpsc::Sender<RequestTask>,
    semaphore: Arc<Semaphore>,
    max_concurrent_requests: usize,
    lifecycle: LifecycleManager,
    idle: Arc<Notify>,
    inflight: InFlightRegistry,
    observer: Arc<dyn ProcessorObserver>,
    client_pool: Arc<ClientPool>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.lifecycle.state() != offload_lifecycle::LifecycleState::Stopped {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                state = ?self.lifecycle.state(),
                "processor dropped without a clean stop; in-flight work was abandoned"
            );
        }
    }
}

/// Owns the task queue and the concurrency semaphore. Cloning a
/// `Processor` shares the same queue and in-flight accounting — it's a
/// handle, not a fresh reactor; the last handle dropped while the
/// processor isn't `Stopped` logs a warning instead of leaking silently.
#[derive(Clone)]
pub struct Processor {
    inner: Arc<Inner>,
}

impl Processor {
    /// Spawns the reactor loop and returns a handle to it. `ctx` is
    /// cloned into every dispatched task.
    pub fn spawn(
        max_queue_size: usize,
        max_concurrent_requests: usize,
        ctx: ExecutionContext,
    ) -> Self {
        let (sender, mut receiver) = mpsc::channel::<RequestTask>(max_queue_size);
        let semaphore = Arc::new(Semaphore::new(max_concurrent_requests));
        let lifecycle = LifecycleManager::new();
        let idle = Arc::new(Notify::new());
        let inflight: InFlightRegistry = Arc::new(Mutex::new(HashMap::new()));
        let next_id = Arc::new(AtomicU64::new(0));

        lifecycle.add_listener(ObserverLifecycleBridge {
            observer: ctx.observer.clone(),
        });
        lifecycle.start().expect("fresh LifecycleManager starts Stopped");
        lifecycle.mark_running().expect("start() always reaches Starting");

        let loop_semaphore = semaphore.clone();
        let loop_idle = idle.clone();
        let loop_lifecycle = lifecycle.clone();
        let loop_inflight = inflight.clone();
        let loop_next_id = next_id.clone();
        let observer_for_inner = ctx.observer.clone();
        let pool_for_sweep = ctx.client.pool().clone();
        let sweep_interval = ctx.client.pool().idle_timeout();
        let sweep_lifecycle = lifecycle.clone();
        let ctx_client_pool = ctx.client.pool().clone();

        // Evicts idle-past-timeout pooled clients on the same cadence as
        // the timeout itself (spec.md §6's `connection_idle_timeout`),
        // independent of request traffic. Stops once the processor
        // leaves `Running` — `stop` does one last sweep of its own.
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if sweep_lifecycle.state() != LifecycleState::Running {
                    break;
                }
                pool_for_sweep.sweep_idle();
            }
        });

        // Each iteration waits for both a queued task and a free permit
        // before spawning the actual execution; this is what turns
        // `max_concurrent_requests` into a hard ceiling rather than a
        // best-effort one.
        //
        // A task still sitting in the channel once the lifecycle leaves
        // `Running` never started, so it's handed straight back to its
        // handler's `retry` instead of being dispatched.
        tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                if loop_lifecycle.state() != LifecycleState::Running {
                    let handler = task.task_handler().clone();
                    handler.retry(task).await;
                    continue;
                }

                let Ok(permit) = loop_semaphore.clone().acquire_owned().await else {
                    break;
                };
                // The permit may have come free because `stop` surrendered
                // another task while we were waiting for one; re-check
                // before dispatching into a processor that has since
                // left `Running`.
                if loop_lifecycle.state() != LifecycleState::Running {
                    drop(permit);
                    let handler = task.task_handler().clone();
                    handler.retry(task).await;
                    continue;
                }
                let task_ctx = ctx.clone();
                let done_idle = loop_idle.clone();
                let registry = loop_inflight.clone();
                let task_id = loop_next_id.fetch_add(1, Ordering::Relaxed);
                let task_for_registry = task.clone();
                let abandoned = Arc::new(AtomicBool::new(false));
                let abandoned_for_exec = abandoned.clone();

                // Holding the registry lock across `spawn` (not across
                // an `.await`) closes the race where the spawned task
                // finishes and removes itself before we've inserted it.
                let registry_for_exec = registry.clone();
                let mut guard = registry.lock().unwrap();
                tokio::spawn(async move {
                    execute_one(task, &task_ctx, abandoned_for_exec, task_id).await;
                    registry_for_exec.lock().unwrap().remove(&task_id);
                    drop(permit);
                    done_idle.notify_waiters();
                });
                guard.insert(task_id, (abandoned, task_for_registry));
                drop(guard);
            }
        });

        Self {
            inner: Arc::new(Inner {
                sender,
                semaphore,
                max_concurrent_requests,
                lifecycle,
                idle,
                inflight,
                observer: observer_for_inner,
                client_pool: ctx_client_pool,
            }),
        }
    }

    /// Enqueues a task. Fails immediately rather than blocking if the
    /// queue is full or the processor isn't running, matching spec.md
    /// §4.3's "reject immediately" admission rule.
    pub fn enqueue(&self, task: RequestTask) -> Result<(), EnqueueError> {
        if !self.inner.lifecycle.accepting_new() {
            return Err(EnqueueError::NotRunning);
        }
        self.inner.sender.try_send(task).map_err(|_| {
            self.inner
                .observer
                .capacity_exceeded(self.queue_len(), self.in_flight_count());
            #[cfg(feature = "metrics")]
            metrics::counter!("offload_capacity_rejections_total").increment(1);
            EnqueueError::MaxCapacity
        })
    }

    pub fn state(&self) -> offload_lifecycle::LifecycleState {
        self.inner.lifecycle.state()
    }

    /// Number of permits currently in use, i.e. requests actually
    /// executing (not merely queued).
    pub fn in_flight_count(&self) -> usize {
        let count = self.inner.max_concurrent_requests - self.inner.semaphore.available_permits();
        #[cfg(feature = "metrics")]
        metrics::gauge!("offload_in_flight_requests").set(count as f64);
        count
    }

    pub fn queue_len(&self) -> usize {
        self.inner.sender.max_capacity() - self.inner.sender.capacity()
    }

    /// Stops accepting new work and waits up to `drain_timeout` for
    /// in-flight requests to finish on their own. Anything still running
    /// once the deadline passes is *not* cancelled — per spec.md §5 the
    /// only hard cancel is process exit — it's surrendered to its
    /// handler's `retry` immediately and left to finish in the
    /// background; its eventual `on_complete`/`on_error` is suppressed
    /// by `execute_one`'s abandoned check so it never double-delivers.
    /// Returns the number of tasks surrendered this way.
    pub async fn stop(&self, drain_timeout: Duration) -> usize {
        let _ = self.inner.lifecycle.begin_drain();

        let deadline = tokio::time::Instant::now() + drain_timeout;
        while self.in_flight_count() > 0 {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            let _ = tokio::time::timeout(remaining, self.inner.idle.notified()).await;
        }

        let abandoned: Vec<(Arc<AtomicBool>, RequestTask)> = {
            let mut guard = self.inner.inflight.lock().unwrap();
            guard.drain().map(|(_, entry)| entry).collect()
        };
        let abandoned_count = abandoned.len();
        for (flag, task) in abandoned {
            flag.store(true, Ordering::SeqCst);
            let handler = task.task_handler().clone();
            handler.retry(task).await;
        }

        let _ = self.inner.lifecycle.begin_stop();
        self.inner.client_pool.sweep_idle();
        let _ = self.inner.lifecycle.mark_stopped();
        abandoned_count
    }
}
