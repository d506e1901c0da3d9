//! The error taxonomy delivered to `TaskHandler::on_error`.
//!
//! Grounded on `tower_resilience_core::ResilienceError<E>`: a unifying
//! enum that avoids hand-written `From` boilerplate, plus `is_*`-style
//! helpers for pattern matching convenience.

use crate::headers::HttpHeaders;
use crate::request::Method;
use serde::{Deserialize, Serialize};

/// Identity carried by every error, so handlers can always tell which
/// request failed without re-threading context themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub method: Method,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_args: Option<serde_json::Value>,
}

/// The specific way a request failed before a response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestErrorKind {
    Connect,
    Dns,
    Tls,
    Timeout,
    Io,
}

/// Could not form or dispatch the request at all.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("request error ({kind:?}) for {method} {url}: {message}", method = context.method, url = context.url)]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub message: String,
    #[serde(flatten)]
    pub context: RequestContext,
}

/// A response was received but treated as a failure because the task
/// opted into `raise_error_responses`.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum HttpError {
    #[error("client error {status} for {method} {url}", method = context.method, url = context.url)]
    ClientError {
        status: u16,
        body: Option<bytes::Bytes>,
        headers: HttpHeaders,
        #[serde(flatten)]
        context: RequestContext,
    },
    #[error("server error {status} for {method} {url}", method = context.method, url = context.url)]
    ServerError {
        status: u16,
        body: Option<bytes::Bytes>,
        headers: HttpHeaders,
        #[serde(flatten)]
        context: RequestContext,
    },
}

impl HttpError {
    pub fn context(&self) -> &RequestContext {
        match self {
            HttpError::ClientError { context, .. } | HttpError::ServerError { context, .. } => {
                context
            }
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            HttpError::ClientError { status, .. } | HttpError::ServerError { status, .. } => {
                *status
            }
        }
    }
}

/// Hit `max_redirects`, or the redirect chain formed a cycle.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum RedirectError {
    #[error("too many redirects ({max_redirects}) for {method} {url}, last location {final_url}", method = context.method, url = context.url)]
    TooManyRedirects {
        max_redirects: u32,
        final_url: String,
        #[serde(flatten)]
        context: RequestContext,
    },
    #[error("recursive redirect to {repeated_url} for {method} {url}", method = context.method, url = context.url)]
    RecursiveRedirect {
        repeated_url: String,
        #[serde(flatten)]
        context: RequestContext,
    },
}

impl RedirectError {
    pub fn context(&self) -> &RequestContext {
        match self {
            RedirectError::TooManyRedirects { context, .. }
            | RedirectError::RecursiveRedirect { context, .. } => context,
        }
    }
}

/// The response body exceeded the configured maximum size.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("response exceeded max_response_size of {limit} bytes for {method} {url}", method = context.method, url = context.url)]
pub struct ResponseTooLargeError {
    pub limit: u64,
    #[serde(flatten)]
    pub context: RequestContext,
}

/// A single type aggregating the whole taxonomy, for handlers that would
/// rather match once than accept five separate parameter types.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum OffloadError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Redirect(#[from] RedirectError),
    #[error(transparent)]
    ResponseTooLarge(#[from] ResponseTooLargeError),
}

impl OffloadError {
    pub fn context(&self) -> &RequestContext {
        match self {
            OffloadError::Request(e) => &e.context,
            OffloadError::Http(e) => e.context(),
            OffloadError::Redirect(e) => e.context(),
            OffloadError::ResponseTooLarge(e) => &e.context,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            OffloadError::Request(RequestError {
                kind: RequestErrorKind::Timeout,
                ..
            })
        )
    }

    pub fn is_redirect_error(&self) -> bool {
        matches!(self, OffloadError::Redirect(_))
    }

    pub fn is_response_too_large(&self) -> bool {
        matches!(self, OffloadError::ResponseTooLarge(_))
    }
}
