//! The immutable `Response` value.

use crate::headers::HttpHeaders;
use crate::request::Method;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Errors constructing a [`Response`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResponseBuildError {
    #[error("status {0} is outside the valid HTTP range 100..=599")]
    StatusOutOfRange(u32),
}

/// An immutable, serializable successful HTTP result, delivered to
/// `TaskHandler::on_complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    status: u16,
    headers: HttpHeaders,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Bytes>,
    method: Method,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_args: Option<serde_json::Value>,
}

impl Response {
    /// Builds a response, validating the status code range per spec.md §3.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        status: u16,
        headers: HttpHeaders,
        body: Option<Bytes>,
        method: Method,
        url: impl Into<String>,
        callback_args: Option<serde_json::Value>,
    ) -> Result<Self, ResponseBuildError> {
        if !(100..=599).contains(&status) {
            return Err(ResponseBuildError::StatusOutOfRange(status as u32));
        }
        Ok(Self {
            status,
            headers,
            body,
            method,
            url: url.into(),
            callback_args,
        })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn callback_args(&self) -> Option<&serde_json::Value> {
        self.callback_args.as_ref()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}
