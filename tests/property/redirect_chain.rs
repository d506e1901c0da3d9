//! Property 7 from spec.md §8: the redirect-visited set is strictly
//! monotonic — revisiting a normalized URL raises `RecursiveRedirect`
//! rather than looping forever.
//!
//! Drives the real engine (synchronous runner, so the outcome is
//! available the instant `enqueue` returns) through redirect chains of
//! varying length that all eventually point back at an earlier hop.

use http_offload_engine::OffloadEngine;
use offload_core::{Method, OffloadError, RedirectError, Request, RequestTask, Response, TaskHandler};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct CapturingHandler {
    error: Mutex<Option<OffloadError>>,
}

#[async_trait::async_trait]
impl TaskHandler for CapturingHandler {
    async fn on_complete(&self, _response: Response, _callback: &str) {}
    async fn on_error(&self, error: OffloadError, _callback: &str) {
        *self.error.lock().unwrap() = Some(error);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn a_cycle_anywhere_in_the_chain_is_caught(chain_len in 1usize..=6, cycle_back_to in 0usize..=5) {
        let cycle_back_to = cycle_back_to.min(chain_len.saturating_sub(1));
        let rt = Runtime::new().unwrap();
        rt.block_on(async move {
            let server = MockServer::start().await;

            for hop in 0..chain_len {
                let next = if hop + 1 < chain_len {
                    format!("/hop{}", hop + 1)
                } else {
                    format!("/hop{cycle_back_to}")
                };
                Mock::given(path(format!("/hop{hop}")))
                    .respond_with(ResponseTemplate::new(302).insert_header("Location", next.as_str()))
                    .mount(&server)
                    .await;
            }

            let engine = OffloadEngine::builder()
                .config(offload_processor::ProcessorConfig::builder().default_max_redirects(chain_len as u32 + 5))
                .testing(true)
                .build()
                .unwrap();

            let handler = Arc::new(CapturingHandler::default());
            let request = Request::builder(Method::Get, format!("{}/hop0", server.uri()))
                .build()
                .unwrap();
            engine
                .enqueue(RequestTask::new(request, handler.clone(), "redirect-cycle"))
                .await
                .unwrap();

            let error = handler.error.lock().unwrap().take();
            let is_recursive_redirect = matches!(
                error,
                Some(OffloadError::Redirect(RedirectError::RecursiveRedirect { .. }))
            );
            prop_assert!(is_recursive_redirect);
            Ok(())
        })?;
    }
}
