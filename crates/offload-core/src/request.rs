//! The immutable `Request` value and its builder.

use crate::headers::HttpHeaders;
use crate::payload::{Payload, PayloadRef};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// The closed set of methods this engine will dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// True for methods spec.md forbids a request body on.
    fn forbids_body(self) -> bool {
        matches!(self, Method::Get | Method::Delete)
    }

    /// The uppercase wire form, e.g. `"POST"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while building a [`Request`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum RequestBuildError {
    #[error("{method} requests must not carry a body")]
    BodyNotAllowed { method: Method },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// An immutable, serializable outbound HTTP request.
///
/// Constructed only through [`RequestBuilder`] so the invariants in
/// spec.md §3 (no body on GET/DELETE, JSON content-type default, empty
/// body normalized to absent) always hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    method: Method,
    #[serde(with = "url_serde")]
    url: Url,
    headers: HttpHeaders,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_redirects: Option<u32>,
}

impl Request {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    /// The request body, if any. A [`Payload::Stored`] body is
    /// rehydrated via `ExternalStorage::materialize` before the first
    /// send attempt, per spec.md §4.2 step 2.
    pub fn body(&self) -> Option<&Payload> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn max_redirects(&self) -> Option<u32> {
        self.max_redirects
    }

    /// Starts a builder for a new request.
    pub fn builder(method: Method, url: impl AsRef<str>) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }
}

/// Builds a [`Request`], enforcing its invariants at `build()`.
pub struct RequestBuilder {
    method: Method,
    url: Result<Url, String>,
    headers: HttpHeaders,
    body: Option<Payload>,
    timeout: Option<Duration>,
    max_redirects: Option<u32>,
    content_type_explicit: bool,
}

impl RequestBuilder {
    pub fn new(method: Method, url: impl AsRef<str>) -> Self {
        Self {
            method,
            url: Url::parse(url.as_ref()).map_err(|e| e.to_string()),
            headers: HttpHeaders::new(),
            body: None,
            timeout: None,
            max_redirects: None,
            content_type_explicit: false,
        }
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        if name.as_ref().eq_ignore_ascii_case("content-type") {
            self.content_type_explicit = true;
        }
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HttpHeaders) -> Self {
        if headers.contains("content-type") {
            self.content_type_explicit = true;
        }
        self.headers = headers;
        self
    }

    /// Sets a raw body held inline. An empty slice normalizes to "no
    /// body", matching spec.md §3.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.body = if body.is_empty() {
            None
        } else {
            Some(Payload::Inline(body))
        };
        self
    }

    /// Sets the body to a reference already held by an external store
    /// (e.g. a caller that offloaded a large upload ahead of time).
    /// Rehydrated via `ExternalStorage::materialize` just before the
    /// first send attempt.
    pub fn body_ref(mut self, payload_ref: PayloadRef) -> Self {
        self.body = Some(Payload::Stored(payload_ref));
        self
    }

    /// Sets a JSON body and, unless the caller set `content-type`
    /// explicitly, defaults it to `application/json; encoding=utf-8`.
    pub fn json_body(mut self, value: &impl Serialize) -> Result<Self, RequestBuildError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| RequestBuildError::InvalidUrl(e.to_string()))?;
        if !self.content_type_explicit {
            self.headers
                .insert("content-type", "application/json; encoding=utf-8");
        }
        self.body = if bytes.is_empty() {
            None
        } else {
            Some(Payload::Inline(Bytes::from(bytes)))
        };
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = Some(max_redirects);
        self
    }

    pub fn build(self) -> Result<Request, RequestBuildError> {
        let url = self.url.map_err(RequestBuildError::InvalidUrl)?;

        if self.body.is_some() && self.method.forbids_body() {
            return Err(RequestBuildError::BodyNotAllowed {
                method: self.method,
            });
        }

        Ok(Request {
            method: self.method,
            url,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
            max_redirects: self.max_redirects,
        })
    }
}

mod url_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use url::Url;

    pub fn serialize<S>(url: &Url, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(url.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Url, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Url::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_with_body_is_rejected() {
        let err = Request::builder(Method::Get, "https://example.com")
            .body(Bytes::from_static(b"oops"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RequestBuildError::BodyNotAllowed { .. }));
    }

    #[test]
    fn empty_body_normalizes_to_absent() {
        let request = Request::builder(Method::Post, "https://example.com")
            .body(Bytes::new())
            .build()
            .unwrap();
        assert!(request.body().is_none());
    }

    #[test]
    fn json_body_defaults_content_type_unless_explicit() {
        let request = Request::builder(Method::Post, "https://example.com")
            .json_body(&serde_json::json!({"a": 1}))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get("content-type"),
            Some("application/json; encoding=utf-8")
        );

        let request = Request::builder(Method::Post, "https://example.com")
            .header("content-type", "application/vnd.custom+json")
            .json_body(&serde_json::json!({"a": 1}))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get("content-type"),
            Some("application/vnd.custom+json")
        );
    }

    #[test]
    fn body_ref_sets_a_stored_payload() {
        let request = Request::builder(Method::Post, "https://example.com")
            .body_ref(PayloadRef {
                store_id: "s3".to_string(),
                key: "uploads/abc".to_string(),
                size: 2_000_000,
                content_type: Some("application/octet-stream".to_string()),
            })
            .build()
            .unwrap();
        assert!(matches!(request.body(), Some(Payload::Stored(_))));
    }

    #[test]
    fn round_trips_through_json() {
        let request = Request::builder(Method::Put, "https://example.com/x?y=1")
            .header("x-a", "b")
            .body(Bytes::from_static(b"hello"))
            .timeout(Duration::from_secs(5))
            .max_redirects(3)
            .build()
            .unwrap();

        let json = serde_json::to_string(&request).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back.method(), Method::Put);
        assert_eq!(back.url().as_str(), "https://example.com/x?y=1");
        assert_eq!(back.body(), request.body());
        assert_eq!(back.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(back.max_redirects(), Some(3));
    }
}
