//! `RequestTemplate` — shared defaults merged into individual requests.

use crate::headers::HttpHeaders;
use crate::request::{Method, Request, RequestBuildError};
use bytes::Bytes;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while resolving a request against a template.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TemplateError {
    #[error("could not resolve url against base_url: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Build(#[from] RequestBuildError),
}

/// Defaults (base URL, headers, query params, timeout) shared by every
/// request produced through this template.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    base_url: Option<Url>,
    default_headers: HttpHeaders,
    default_params: Vec<(String, String)>,
    default_timeout: Duration,
}

impl RequestTemplate {
    pub fn builder() -> RequestTemplateBuilder {
        RequestTemplateBuilder::new()
    }

    /// Resolves `path` (absolute, or relative to `base_url`) and merges
    /// template headers/params/timeout per spec.md §3: per-request headers
    /// win over defaults, default params are appended to the query string,
    /// timeout defaults when the caller omits one.
    pub fn request(
        &self,
        method: Method,
        path: impl AsRef<str>,
        configure: impl FnOnce(RequestPartial) -> RequestPartial,
    ) -> Result<Request, TemplateError> {
        let mut url = match &self.base_url {
            Some(base) => base
                .join(path.as_ref())
                .map_err(|e| TemplateError::InvalidUrl(e.to_string()))?,
            None => Url::parse(path.as_ref()).map_err(|e| TemplateError::InvalidUrl(e.to_string()))?,
        };

        if !self.default_params.is_empty() {
            let mut pairs = url.query_pairs().into_owned().collect::<Vec<_>>();
            for (k, v) in &self.default_params {
                if !pairs.iter().any(|(existing, _)| existing == k) {
                    pairs.push((k.clone(), v.clone()));
                }
            }
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }

        let partial = configure(RequestPartial::new());

        let mut builder = Request::builder(method, url.as_str());
        builder = builder.headers(partial.headers.merge_over(&self.default_headers));
        if let Some(body) = partial.body {
            builder = builder.body(body);
        }
        builder = builder.timeout(partial.timeout.unwrap_or(self.default_timeout));
        if let Some(max_redirects) = partial.max_redirects {
            builder = builder.max_redirects(max_redirects);
        }

        Ok(builder.build()?)
    }
}

/// Per-request overrides supplied to [`RequestTemplate::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestPartial {
    headers: HttpHeaders,
    body: Option<Bytes>,
    timeout: Option<Duration>,
    max_redirects: Option<u32>,
}

impl RequestPartial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = Some(max_redirects);
        self
    }
}

/// Builder for [`RequestTemplate`].
pub struct RequestTemplateBuilder {
    base_url: Option<Url>,
    default_headers: HttpHeaders,
    default_params: Vec<(String, String)>,
    default_timeout: Duration,
}

impl RequestTemplateBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HttpHeaders::new(),
            default_params: Vec::new(),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(mut self, base_url: impl AsRef<str>) -> Result<Self, TemplateError> {
        self.base_url =
            Some(Url::parse(base_url.as_ref()).map_err(|e| TemplateError::InvalidUrl(e.to_string()))?);
        Ok(self)
    }

    pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn default_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_params.push((key.into(), value.into()));
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn build(self) -> RequestTemplate {
        RequestTemplate {
            base_url: self.base_url,
            default_headers: self.default_headers,
            default_params: self.default_params,
            default_timeout: self.default_timeout,
        }
    }
}

impl Default for RequestTemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
