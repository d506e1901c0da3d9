//! `Client` — sends one logical HTTP attempt, with transport-level retry.

use crate::pool::{ClientPool, PoolError};
use bytes::Bytes;
use offload_core::{HttpHeaders, Method, RequestContext, RequestError, RequestErrorKind};
use std::sync::Arc;
use std::time::Duration;

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// The tiny fixed backoff between transport-retry attempts. Spec.md §5
/// calls for "a tiny backoff," not a configurable schedule — the retry
/// budget itself (`transport_retries`) is what's configurable.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Sends a single logical HTTP request (one redirect hop) over a pooled
/// client, retrying connect/IO failures up to a configurable budget.
///
/// Grounded on `cyclotron_fetch::run_job`'s request-build / send /
/// classify sequence, generalized with the origin pool and retry budget
/// spec.md §4.2/§4.3 add on top of cyclotron-fetch's single shared
/// client.
pub struct Client {
    pool: Arc<ClientPool>,
    transport_retries: u32,
}

impl Client {
    pub fn new(pool: Arc<ClientPool>, transport_retries: u32) -> Self {
        Self {
            pool,
            transport_retries,
        }
    }

    /// The origin pool backing this client, so callers that own a
    /// `Client` (rather than constructing the pool themselves) can still
    /// drive periodic idle eviction.
    pub fn pool(&self) -> &Arc<ClientPool> {
        &self.pool
    }

    /// Issues `method url` with `headers`/`body`, retrying transport
    /// failures (never HTTP error statuses) up to `transport_retries`
    /// additional attempts beyond the first.
    pub async fn send(
        &self,
        method: Method,
        url: &url::Url,
        headers: &HttpHeaders,
        body: Option<Bytes>,
        context: &RequestContext,
    ) -> Result<reqwest::Response, RequestError> {
        let mut budget = self.transport_retries;
        self.send_with_budget(method, url, headers, body, context, &mut budget)
            .await
    }

    /// Same as [`Client::send`], but draws retry attempts from
    /// `budget` instead of the client's own configured count and
    /// decrements it as attempts are spent. A redirect loop threads one
    /// `budget` across every hop of a logical request, rather than
    /// resetting it at each hop.
    pub async fn send_with_budget(
        &self,
        method: Method,
        url: &url::Url,
        headers: &HttpHeaders,
        body: Option<Bytes>,
        context: &RequestContext,
        budget: &mut u32,
    ) -> Result<reqwest::Response, RequestError> {
        let client = self
            .pool
            .get(url)
            .map_err(|e| pool_error_to_request_error(e, context))?;

        loop {
            let mut builder = client.request(to_reqwest_method(method), url.clone());
            for (name, value) in headers.iter() {
                builder = builder.header(name, value);
            }
            if let Some(body) = body.clone() {
                builder = builder.body(body);
            }

            match builder.send().await {
                Ok(response) => {
                    self.pool.record_success(url);
                    return Ok(response);
                }
                Err(err) if *budget > 0 && is_retryable(&err) => {
                    self.pool.record_failure(url);
                    *budget -= 1;
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(err) => {
                    self.pool.record_failure(url);
                    return Err(reqwest_error_to_request_error(err, context));
                }
            }
        }
    }
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

fn reqwest_error_to_request_error(err: reqwest::Error, context: &RequestContext) -> RequestError {
    let kind = if err.is_timeout() {
        RequestErrorKind::Timeout
    } else if err.is_connect() {
        RequestErrorKind::Connect
    } else {
        RequestErrorKind::Io
    };
    RequestError {
        kind,
        message: err.to_string(),
        context: context.clone(),
    }
}

fn pool_error_to_request_error(err: PoolError, context: &RequestContext) -> RequestError {
    RequestError {
        kind: RequestErrorKind::Connect,
        message: err.to_string(),
        context: context.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_core::Method;
    use std::time::Duration as StdDuration;
    use wiremock::matchers::method as http_method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx(url: &str) -> RequestContext {
        RequestContext {
            method: Method::Get,
            url: url.to_string(),
            callback_args: None,
        }
    }

    #[tokio::test]
    async fn successful_send_returns_the_response_and_records_success() {
        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let pool = Arc::new(ClientPool::new(4, StdDuration::from_secs(60)));
        let client = Client::new(pool, 0);
        let url = url::Url::parse(&server.uri()).unwrap();
        let response = client
            .send(Method::Get, &url, &HttpHeaders::new(), None, &ctx(url.as_str()))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn method_conversion_covers_every_variant() {
        assert_eq!(to_reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(Method::Post), reqwest::Method::POST);
        assert_eq!(to_reqwest_method(Method::Put), reqwest::Method::PUT);
        assert_eq!(to_reqwest_method(Method::Patch), reqwest::Method::PATCH);
        assert_eq!(to_reqwest_method(Method::Delete), reqwest::Method::DELETE);
    }
}
