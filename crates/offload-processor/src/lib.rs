//! The reactor: bounded admission, per-request execution (redirects,
//! size limits, payload offload), and the lifecycle-gated drain/stop
//! sequence. Everything here is built from capability traits and value
//! types defined in `offload-core`, `offload-client`, `offload-reader`,
//! `offload-storage`, and `offload-lifecycle` — this crate wires them
//! together into the engine's actual concurrency model.

mod config;
mod execute;
mod processor;
mod sync_executor;

pub use config::{ConfigError, ProcessorConfig, ProcessorConfigBuilder};
pub use execute::{execute_one, ExecutionContext};
pub use processor::{EnqueueError, Processor};
pub use sync_executor::SynchronousExecutor;
