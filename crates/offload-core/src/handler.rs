//! `TaskHandler` — the capability a caller implements to receive outcomes.

use crate::error::OffloadError;
use crate::response::Response;
use crate::task::RequestTask;

/// Receives the outcome of a dispatched [`RequestTask`].
///
/// A capability trait rather than a base class: callers implement only
/// this, and nothing in the engine downcasts or inspects the concrete
/// type behind it. Grounded directly on spec.md §4.6 — no teacher
/// analogue names callbacks this way, but the async-trait-over-Arc
/// shape follows `tower_resilience_core::EventListener`.
#[async_trait::async_trait]
pub trait TaskHandler: Send + Sync {
    /// Called once, after a request completed with a response the task
    /// did not ask to be raised as an error.
    async fn on_complete(&self, response: Response, callback: &str);

    /// Called once, after a request failed terminally (transport error,
    /// redirect error, oversized response, or an opted-in HTTP error).
    async fn on_error(&self, error: OffloadError, callback: &str);

    /// Called when the engine is draining and this task's attempt was
    /// abandoned before it ran; the handler decides whether to resubmit.
    /// The default does nothing, matching handlers that don't retry.
    async fn retry(&self, _task: RequestTask) {}
}
