//! Shared value types for the HTTP offload engine: requests, responses,
//! the error taxonomy, the event-listener primitive, and the two
//! capability traits (`TaskHandler`, `ProcessorObserver`) that callers
//! implement.
//!
//! Nothing in this crate touches a socket; transport lives in
//! `offload-client`, queuing and dispatch in `offload-processor`.

mod error;
mod events;
mod handler;
mod headers;
mod lifecycle;
mod observer;
mod payload;
mod request;
mod response;
mod task;
mod template;

pub use error::{
    HttpError, OffloadError, RedirectError, RequestContext, RequestError, RequestErrorKind,
    ResponseTooLargeError,
};
pub use events::{BoxedEventListener, EventListener, EventListeners, FnListener, OffloadEvent};
pub use handler::TaskHandler;
pub use headers::HttpHeaders;
pub use lifecycle::LifecycleState;
pub use observer::{NoopObserver, ProcessorObserver, RequestOutcome};
pub use payload::{Payload, PayloadRef};
pub use request::{Method, Request, RequestBuildError, RequestBuilder};
pub use response::{Response, ResponseBuildError};
pub use task::RequestTask;
pub use template::{RequestPartial, RequestTemplate, RequestTemplateBuilder, TemplateError};
