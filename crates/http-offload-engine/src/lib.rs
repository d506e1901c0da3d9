//! A bounded-concurrency engine for offloading HTTP requests off a hot
//! path: enqueue a request with a handler, the engine dispatches it
//! (with retries, redirects, size limits, and optional payload
//! offload) and calls the handler back with the outcome.
//!
//! # Quick Start
//!
//! ```no_run
//! use http_offload_engine::OffloadEngine;
//! use offload_core::{Method, OffloadError, Request, RequestTask, Response, TaskHandler};
//! use std::sync::Arc;
//!
//! struct PrintHandler;
//!
//! #[async_trait::async_trait]
//! impl TaskHandler for PrintHandler {
//!     async fn on_complete(&self, response: Response, callback: &str) {
//!         println!("{callback} -> {}", response.status());
//!     }
//!     async fn on_error(&self, error: OffloadError, callback: &str) {
//!         eprintln!("{callback} failed: {error}");
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = OffloadEngine::builder().build()?;
//! let request = Request::builder(Method::Get, "https://example.com").build()?;
//! let task = RequestTask::new(request, Arc::new(PrintHandler), "job#42");
//! engine.enqueue(task).await?;
//! engine.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Layout
//!
//! This crate is a thin facade over five focused crates, each usable on
//! its own:
//!
//! - [`offload_core`] — `Request`/`Response`/error value types, the
//!   `TaskHandler`/`ProcessorObserver` capability traits, and the
//!   event-listener primitive.
//! - [`offload_storage`] — the `PayloadStore` contract and
//!   `ExternalStorage`'s offload/materialize/cleanup policy.
//! - [`offload_client`] — per-origin pooled `reqwest::Client`s and the
//!   transport-retry send primitive.
//! - [`offload_reader`] — the chunked, size-capped, decompressing
//!   response body reader.
//! - [`offload_lifecycle`] — the processor's compare-and-swap lifecycle
//!   state machine.
//! - [`offload_processor`] — the reactor, admission control, and the
//!   per-request execution pipeline built from all of the above.
//!
//! # Testing Without a Reactor
//!
//! [`OffloadEngineBuilder::testing`] swaps the concurrent reactor for a
//! synchronous, in-line executor. No global flag: the choice is made
//! once, at `build()`, and lives entirely in the returned
//! [`OffloadEngine`] value.
//!
//! ```no_run
//! # use http_offload_engine::OffloadEngine;
//! let engine = OffloadEngine::builder().testing(true).build().unwrap();
//! ```

mod builder;

pub use builder::{EngineBuildError, OffloadEngine, OffloadEngineBuilder};

pub use offload_client;
pub use offload_core;
pub use offload_lifecycle;
pub use offload_processor;
pub use offload_reader;
pub use offload_storage;
