//! `execute_one` — the per-request execution pipeline shared by
//! [`crate::Processor`]'s reactor loop and
//! [`crate::sync_executor::SynchronousExecutor`].
//!
//! Grounded on `cyclotron_fetch::run_job`'s overall shape (build request,
//! send, classify status, fetch body, dispatch) from
//! other_examples/PostHog, extended with the redirect chain, size limit,
//! and payload-offload steps spec.md §4.2 adds.

use bytes::Bytes;
use futures::FutureExt;
use offload_client::Client;
use offload_core::{
    HttpError, HttpHeaders, Method, OffloadError, Payload, ProcessorObserver, RedirectError,
    RequestContext, RequestError, RequestErrorKind, RequestOutcome, RequestTask, Response,
};
use offload_reader::{ReaderError, ResponseReader};
use offload_storage::ExternalStorage;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// The shared dependencies every execution needs. Bundled so
/// `Processor` and `SynchronousExecutor` construct it once and hand out
/// clones (it's all `Arc`s) per task.
#[derive(Clone)]
pub struct ExecutionContext {
    pub client: Arc<Client>,
    pub reader: Arc<ResponseReader>,
    pub storage: Arc<ExternalStorage>,
    pub default_timeout: Duration,
    pub default_max_redirects: u32,
    pub transport_retries: u32,
    pub raise_error_responses: bool,
    pub observer: Arc<dyn ProcessorObserver>,
}

/// Runs one task end to end and dispatches its outcome to
/// `task.task_handler()`. Never returns an error itself — transport,
/// redirect, size, and HTTP-status failures are all delivered through
/// `on_error`; a panicking handler is caught and reported to
/// `ProcessorObserver::error` rather than allowed to poison the caller.
///
/// `abandoned` is checked just before delivery: per spec.md §5, a task
/// still running when `stop`'s drain deadline passes is *not* cancelled
/// mid-flight, it's surrendered to `TaskHandler::retry` immediately and
/// left to finish in the background. Checking the flag here, rather
/// than aborting the future, is what keeps that surrender and this
/// task's own eventual `on_complete`/`on_error` from both firing —
/// invariant 1 in spec.md §8 promises exactly one terminal delivery.
pub async fn execute_one(task: RequestTask, ctx: &ExecutionContext, abandoned: Arc<AtomicBool>, task_id: u64) {
    let request = task.request();
    let context = RequestContext {
        method: request.method(),
        url: request.url().to_string(),
        callback_args: task.callback_args().cloned(),
    };

    ctx.observer.request_started(task_id, request);

    // Rehydrate a Stored request body before the first send attempt, per
    // spec.md §4.2 step 2. The original payload is kept so a Stored one
    // can be deleted after a successful dispatch (spec.md §4.5).
    let request_payload = request.body().cloned();
    let body = match &request_payload {
        Some(payload) => match ctx.storage.materialize(payload).await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                let error = OffloadError::Request(RequestError {
                    kind: RequestErrorKind::Io,
                    message: format!("failed to rehydrate request body: {err}"),
                    context: context.clone(),
                });
                if !abandoned.load(Ordering::SeqCst) {
                    deliver_error(&task, ctx, task_id, error).await;
                }
                return;
            }
        },
        None => None,
    };

    let started = std::time::Instant::now();
    let outcome = run_request(
        request.method(),
        request.url(),
        request.headers(),
        body,
        request.timeout().unwrap_or(ctx.default_timeout),
        request.max_redirects().unwrap_or(ctx.default_max_redirects),
        &context,
        ctx,
    )
    .await;
    let duration = started.elapsed();

    if abandoned.load(Ordering::SeqCst) {
        if let Ok((_, Some(payload))) = outcome {
            ctx.storage.cleanup(&payload).await;
        }
        return;
    }

    match outcome {
        Ok((response, offloaded)) => {
            #[cfg(feature = "metrics")]
            {
                metrics::counter!("offload_requests_total", "outcome" => "success").increment(1);
                metrics::histogram!("offload_request_duration_seconds")
                    .record(duration.as_secs_f64());
            }

            if let Some(payload) = &request_payload {
                if payload.is_stored() {
                    ctx.storage.cleanup(payload).await;
                }
            }

            let response_for_observer = response.clone();
            dispatch(
                task.task_handler().on_complete(response, task.callback()),
                ctx,
                task.callback(),
            )
            .await;
            ctx.observer
                .request_ended(task_id, RequestOutcome::Completed(&response_for_observer));

            if let Some(payload) = offloaded {
                ctx.storage.cleanup(&payload).await;
            }
        }
        Err(error) => {
            #[cfg(feature = "metrics")]
            {
                metrics::counter!("offload_requests_total", "outcome" => "error").increment(1);
                metrics::histogram!("offload_request_duration_seconds")
                    .record(duration.as_secs_f64());
            }
            deliver_error(&task, ctx, task_id, error).await;
        }
    }
}

/// Delivers `error` to `task.task_handler().on_error`, then reports the
/// same error to `request_ended`. Split out since both the rehydration
/// failure path and the main execution path need it.
async fn deliver_error(task: &RequestTask, ctx: &ExecutionContext, task_id: u64, error: OffloadError) {
    let error_for_observer = error.clone();
    dispatch(
        task.task_handler().on_error(error, task.callback()),
        ctx,
        task.callback(),
    )
    .await;
    ctx.observer
        .request_ended(task_id, RequestOutcome::Failed(&error_for_observer));
}

/// Awaits a handler callback, catching a panic so it never propagates
/// into the reactor. Per spec.md §4.2 step 11 and §7: the panic is
/// always swallowed, but reported to `ProcessorObserver::error` first.
async fn dispatch(fut: impl std::future::Future<Output = ()>, ctx: &ExecutionContext, callback: &str) {
    if let Err(panic_payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        let message = panic_message(panic_payload.as_ref());
        #[cfg(feature = "tracing")]
        tracing::error!(%message, %callback, "task handler panicked; result contained, reactor unaffected");
        ctx.observer.error(&message, callback);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Applies the overall request timeout around the redirect-following
/// exchange. Per spec.md §4.2 step 4: bounds total wall-clock, not
/// per-redirect-hop.
async fn run_request(
    method: Method,
    url: &Url,
    headers: &HttpHeaders,
    body: Option<Bytes>,
    timeout: Duration,
    max_redirects: u32,
    context: &RequestContext,
    ctx: &ExecutionContext,
) -> Result<(Response, Option<Payload>), OffloadError> {
    match tokio::time::timeout(
        timeout,
        follow_redirects(method, url.clone(), headers.clone(), body, max_redirects, context, ctx),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(OffloadError::Request(RequestError {
            kind: RequestErrorKind::Timeout,
            message: format!("request exceeded its {timeout:?} timeout"),
            context: context.clone(),
        })),
    }
}

async fn follow_redirects(
    mut method: Method,
    mut url: Url,
    mut headers: HttpHeaders,
    mut body: Option<Bytes>,
    max_redirects: u32,
    context: &RequestContext,
    ctx: &ExecutionContext,
) -> Result<(Response, Option<Payload>), OffloadError> {
    let mut visited = HashSet::new();
    let mut followed = 0u32;
    let mut retry_budget = ctx.transport_retries;

    loop {
        if !visited.insert(normalize(&url)) {
            return Err(OffloadError::Redirect(RedirectError::RecursiveRedirect {
                repeated_url: url.to_string(),
                context: context.clone(),
            }));
        }

        let reqwest_response = ctx
            .client
            .send_with_budget(method, &url, &headers, body.clone(), context, &mut retry_budget)
            .await?;

        let status = reqwest_response.status().as_u16();

        if (300..400).contains(&status) {
            if let Some(location) = reqwest_response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                if followed >= max_redirects {
                    return Err(OffloadError::Redirect(RedirectError::TooManyRedirects {
                        max_redirects,
                        final_url: url.to_string(),
                        context: context.clone(),
                    }));
                }

                let next_url = url.join(location).map_err(|e| {
                    OffloadError::Request(RequestError {
                        kind: RequestErrorKind::Io,
                        message: format!("invalid redirect location {location:?}: {e}"),
                        context: context.clone(),
                    })
                })?;

                if next_url.origin() != url.origin() {
                    headers.remove("authorization");
                }

                if matches!(status, 301 | 302 | 303) && method != Method::Get {
                    method = Method::Get;
                    body = None;
                }
                // 307/308 preserve method and body unchanged.

                url = next_url;
                followed += 1;
                continue;
            }
        }

        let response_headers = HttpHeaders::from_header_map(reqwest_response.headers());

        let response_bytes = ctx
            .reader
            .read(reqwest_response, context)
            .await
            .map_err(|e| reader_error_to_offload(e))?;

        // Per spec.md §4.2 steps 8-9: classify the status against
        // raise_error_responses *before* offloading — a body that's
        // about to become part of an HttpError is never worth offloading
        // (and offloading it here, then discarding the result on this
        // error path, would leak the stored blob forever).
        if ctx.raise_error_responses && status >= 400 {
            let error = if status < 500 {
                HttpError::ClientError {
                    status,
                    body: Some(response_bytes),
                    headers: response_headers,
                    context: context.clone(),
                }
            } else {
                HttpError::ServerError {
                    status,
                    body: Some(response_bytes),
                    headers: response_headers,
                    context: context.clone(),
                }
            };
            return Err(OffloadError::Http(error));
        }

        let content_type = response_headers.get("content-type").map(str::to_string);
        let offloaded = ctx
            .storage
            .maybe_offload(response_bytes.clone(), content_type.as_deref())
            .await
            .ok()
            .filter(|p| p.is_stored());

        let response = Response::new(
            status,
            response_headers,
            Some(response_bytes),
            method,
            url.to_string(),
            context.callback_args.clone(),
        )
        .map_err(|e| {
            OffloadError::Request(RequestError {
                kind: RequestErrorKind::Io,
                message: e.to_string(),
                context: context.clone(),
            })
        })?;

        return Ok((response, offloaded));
    }
}

fn normalize(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.as_str().to_string()
}

fn reader_error_to_offload(err: ReaderError) -> OffloadError {
    match err {
        ReaderError::TooLarge(e) => OffloadError::ResponseTooLarge(e),
        ReaderError::Transport(e) => OffloadError::Request(e),
    }
}
