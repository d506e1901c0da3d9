//! `ProcessorObserver` — optional visibility into processor lifecycle.

use crate::error::OffloadError;
use crate::lifecycle::LifecycleState;
use crate::request::Request;
use crate::response::Response;

/// How a single task's execution ended, handed to
/// [`ProcessorObserver::request_ended`]. Borrows rather than owns: the
/// observer is called before the value is moved into `TaskHandler`'s
/// delivery, or after, depending on the branch — never both.
pub enum RequestOutcome<'a> {
    Completed(&'a Response),
    Failed(&'a OffloadError),
}

/// Observes processor-wide events without participating in task
/// outcomes. Separate from [`crate::handler::TaskHandler`] because most
/// callers that want metrics/logging don't want to also implement
/// per-task delivery.
///
/// The method set is spec.md §4.7's named signals exactly — no more, no
/// fewer — so a caller reading this trait sees the engine's complete
/// observable surface.
///
/// Grounded on `tower_resilience_core::EventListener`: every method has
/// a no-op default, so implementing one hook doesn't require stubbing
/// the rest.
pub trait ProcessorObserver: Send + Sync {
    /// The reactor reached `Running` and is accepting work.
    fn started(&self) {}

    /// The reactor reached `Stopped`; no further signals follow.
    fn stopped(&self) {}

    /// A task's execution began. Fired once, unconditionally, before the
    /// first send attempt — per spec.md §4.2 step 1.
    fn request_started(&self, _task_id: u64, _request: &Request) {}

    /// A task's execution ended. Fired once `task_id`'s terminal delivery
    /// (`TaskHandler::on_complete`/`on_error`) has returned, so the
    /// sequence per task is strictly `request_started` → delivery →
    /// `request_ended`.
    fn request_ended(&self, _task_id: u64, _outcome: RequestOutcome<'_>) {}

    /// A handler callback panicked. `message` is the caught panic
    /// payload, `context` identifies which task (its callback string).
    /// Per spec.md §7, the panic itself is always swallowed; this is the
    /// only place it's reported.
    fn error(&self, _message: &str, _context: &str) {}

    /// `enqueue` rejected a task because the queue was full.
    fn capacity_exceeded(&self, _queue_size: usize, _in_flight: usize) {}

    /// The lifecycle state machine made a transition.
    fn state_transition(&self, _from: LifecycleState, _to: LifecycleState) {}
}

/// The observer used when a caller registers none. Costs nothing beyond
/// the vtable call, the same idiom an empty `EventListeners` collection
/// uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProcessorObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HttpHeaders;
    use crate::request::Method;

    #[test]
    fn noop_observer_implements_every_hook_without_panicking() {
        let observer = NoopObserver;
        let request = Request::builder(Method::Get, "https://example.com")
            .build()
            .unwrap();
        let response = Response::new(200, HttpHeaders::new(), None, Method::Get, "https://example.com", None)
            .unwrap();
        let error = OffloadError::from(crate::error::RequestError {
            kind: crate::error::RequestErrorKind::Timeout,
            message: "timed out".to_string(),
            context: crate::error::RequestContext {
                method: Method::Get,
                url: "https://example.com".to_string(),
                callback_args: None,
            },
        });

        observer.started();
        observer.request_started(1, &request);
        observer.request_ended(1, RequestOutcome::Completed(&response));
        observer.request_ended(2, RequestOutcome::Failed(&error));
        observer.error("boom", "job#1");
        observer.capacity_exceeded(4, 2);
        observer.state_transition(LifecycleState::Starting, LifecycleState::Running);
        observer.stopped();
    }
}
