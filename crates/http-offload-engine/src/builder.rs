//! `OffloadEngine` — the single owned value a caller constructs once and
//! holds for the life of the process (or the life of a test).
//!
//! Grounded on spec.md §9's explicit rejection of a global test-mode
//! flag and a process-wide handler registry: everything a caller needs
//! is reachable from the `OffloadEngine` value itself, chosen once at
//! `build()` time via `OffloadEngineBuilder::testing`.

use offload_client::{Client, ClientPool};
use offload_core::{NoopObserver, ProcessorObserver, RequestTask};
use offload_processor::{
    ConfigError, EnqueueError, ExecutionContext, Processor, ProcessorConfig,
    ProcessorConfigBuilder, SynchronousExecutor,
};
use offload_reader::ResponseReader;
use offload_storage::ExternalStorage;
use std::sync::Arc;
use std::time::Duration;

/// Either the real concurrent reactor or the inline synchronous path,
/// chosen once at construction. Never a runtime branch on a global
/// flag.
enum Runner {
    Real(Processor),
    Sync(SynchronousExecutor),
}

/// The engine: enqueue a [`RequestTask`], its outcome is delivered to
/// the task's own `TaskHandler`. Cheap to clone — it's a handle over
/// `Arc`-backed state, same as `Processor`.
#[derive(Clone)]
pub struct OffloadEngine {
    runner: Arc<Runner>,
    drain_timeout: Duration,
}

impl OffloadEngine {
    pub fn builder() -> OffloadEngineBuilder {
        OffloadEngineBuilder::new()
    }

    /// Submits a task. In the real runner this may reject with
    /// [`EnqueueError`] if the queue is full or the engine isn't
    /// running; the synchronous runner always accepts and runs the
    /// task inline before returning.
    pub async fn enqueue(&self, task: RequestTask) -> Result<(), EnqueueError> {
        match self.runner.as_ref() {
            Runner::Real(processor) => processor.enqueue(task),
            Runner::Sync(executor) => {
                executor.enqueue(task).await;
                Ok(())
            }
        }
    }

    /// Stops accepting new work and waits for in-flight requests to
    /// finish, up to the configured drain timeout. A no-op for the
    /// synchronous runner, which never has in-flight work once
    /// `enqueue` returns.
    pub async fn stop(&self) -> usize {
        match self.runner.as_ref() {
            Runner::Real(processor) => processor.stop(self.drain_timeout).await,
            Runner::Sync(_) => 0,
        }
    }

    /// `None` for the synchronous runner, which has no lifecycle state
    /// machine of its own.
    pub fn state(&self) -> Option<offload_lifecycle::LifecycleState> {
        match self.runner.as_ref() {
            Runner::Real(processor) => Some(processor.state()),
            Runner::Sync(_) => None,
        }
    }
}

/// Errors raised building an [`OffloadEngine`].
#[derive(Debug, thiserror::Error)]
pub enum EngineBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Builds an [`OffloadEngine`] from a [`ProcessorConfig`] (or its
/// builder) plus an optional observer.
pub struct OffloadEngineBuilder {
    config: ProcessorConfigBuilder,
    observer: Arc<dyn ProcessorObserver>,
    testing: bool,
}

impl OffloadEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: ProcessorConfig::builder(),
            observer: Arc::new(NoopObserver),
            testing: false,
        }
    }

    /// Replaces the whole config builder in one call, for callers who
    /// prefer to assemble it separately.
    pub fn config(mut self, config: ProcessorConfigBuilder) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ProcessorObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Selects the synchronous, queue-free runner instead of the real
    /// reactor. Intended for tests that want deterministic, in-order
    /// completion without spawning a background task.
    pub fn testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }

    pub fn build(self) -> Result<OffloadEngine, EngineBuildError> {
        let config = self.config.build()?;
        let drain_timeout = config.drain_timeout;

        let mut pool = ClientPool::new(config.max_clients, config.connection_idle_timeout);
        if let Some(user_agent) = config.user_agent.clone() {
            pool = pool.with_user_agent(user_agent);
        }
        if let Some(proxy) = config.proxy.clone() {
            pool = pool.with_proxy(proxy);
        }
        let client = Arc::new(Client::new(Arc::new(pool), config.transport_retries));
        let reader = Arc::new(ResponseReader::new(config.max_response_size));
        let storage = Arc::new(match config.payload_store.clone() {
            Some(store) => ExternalStorage::new(store, config.external_payload_threshold),
            None => ExternalStorage::disabled(),
        });

        let ctx = ExecutionContext {
            client,
            reader,
            storage,
            default_timeout: config.default_timeout,
            default_max_redirects: config.default_max_redirects,
            transport_retries: config.transport_retries,
            raise_error_responses: config.raise_error_responses,
            observer: self.observer,
        };

        let runner = if self.testing {
            Runner::Sync(SynchronousExecutor::new(ctx))
        } else {
            Runner::Real(Processor::spawn(
                config.max_queue_size,
                config.max_concurrent_requests,
                ctx,
            ))
        };

        Ok(OffloadEngine {
            runner: Arc::new(runner),
            drain_timeout,
        })
    }
}

impl Default for OffloadEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
