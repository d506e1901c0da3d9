//! `RequestTask` — the unit of work handed to the engine.

use crate::handler::TaskHandler;
use crate::request::Request;
use std::sync::Arc;

/// Binds a [`Request`] to the handler that should receive its outcome and
/// an opaque callback selector the engine never inspects.
///
/// Grounded on the shape of `cyclotron_fetch::FetchParameters`
/// (other_examples/PostHog-posthog__rust-cyclotron-fetch): what a caller
/// must hand a fetch worker to get an HTTP exchange executed on its
/// behalf.
#[derive(Clone)]
pub struct RequestTask {
    request: Request,
    task_handler: Arc<dyn TaskHandler>,
    callback: String,
    callback_args: Option<serde_json::Value>,
}

impl RequestTask {
    pub fn new(
        request: Request,
        task_handler: Arc<dyn TaskHandler>,
        callback: impl Into<String>,
    ) -> Self {
        Self {
            request,
            task_handler,
            callback: callback.into(),
            callback_args: None,
        }
    }

    pub fn with_callback_args(mut self, args: serde_json::Value) -> Self {
        self.callback_args = Some(args);
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn task_handler(&self) -> &Arc<dyn TaskHandler> {
        &self.task_handler
    }

    /// Opaque identifier forwarded verbatim to the handler. The engine
    /// never interprets this string.
    pub fn callback(&self) -> &str {
        &self.callback
    }

    pub fn callback_args(&self) -> Option<&serde_json::Value> {
        self.callback_args.as_ref()
    }
}
