//! Properties 2 and 3 from spec.md §8: `in_flight_count` never exceeds
//! `max_concurrent_requests`, and `queue_len + in_flight_count` never
//! exceeds `max_concurrent_requests + max_queue_size`.
//!
//! Grounded on `bulkhead_respects_max_concurrent`-style property tests:
//! spawn a burst of concurrent work against a bounded admission point
//! and sample the high-water mark from a background poller while it
//! runs.

use offload_client::{Client, ClientPool};
use offload_core::{Method, NoopObserver, OffloadError, Request, RequestTask, Response, TaskHandler};
use offload_processor::{ExecutionContext, Processor, ProcessorConfig};
use offload_reader::ResponseReader;
use offload_storage::ExternalStorage;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer, ResponseTemplate};

struct NullHandler;

#[async_trait::async_trait]
impl TaskHandler for NullHandler {
    async fn on_complete(&self, _response: Response, _callback: &str) {}
    async fn on_error(&self, _error: OffloadError, _callback: &str) {}
}

fn ctx(max_response_size: u64) -> ExecutionContext {
    let config = ProcessorConfig::builder()
        .max_response_size(max_response_size)
        .build()
        .unwrap();
    ExecutionContext {
        client: Arc::new(Client::new(
            Arc::new(ClientPool::new(config.max_clients, config.connection_idle_timeout)),
            config.transport_retries,
        )),
        reader: Arc::new(ResponseReader::new(config.max_response_size)),
        storage: Arc::new(ExternalStorage::disabled()),
        default_timeout: config.default_timeout,
        default_max_redirects: config.default_max_redirects,
        transport_retries: config.transport_retries,
        raise_error_responses: config.raise_error_responses,
        observer: Arc::new(NoopObserver),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn in_flight_and_queue_stay_within_bounds(
        max_concurrent in 1usize..=8,
        max_queue in 0usize..=8,
        num_requests in 1usize..=30,
        work_delay_ms in 1u64..=15,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(wiremock::matchers::any())
                .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(work_delay_ms)))
                .mount(&server)
                .await;

            let processor = Processor::spawn(max_queue, max_concurrent, ctx(1024 * 1024));

            let observed_max_in_flight = Arc::new(AtomicUsize::new(0));
            let observed_max_total = Arc::new(AtomicUsize::new(0));
            let stop_polling = Arc::new(std::sync::atomic::AtomicBool::new(false));

            let poll_processor = processor.clone();
            let poll_in_flight = observed_max_in_flight.clone();
            let poll_total = observed_max_total.clone();
            let poll_stop = stop_polling.clone();
            let poller = tokio::spawn(async move {
                while !poll_stop.load(Ordering::SeqCst) {
                    let in_flight = poll_processor.in_flight_count();
                    let queued = poll_processor.queue_len();
                    poll_in_flight.fetch_max(in_flight, Ordering::SeqCst);
                    poll_total.fetch_max(in_flight + queued, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_micros(200)).await;
                }
            });

            for _ in 0..num_requests {
                let request = Request::builder(Method::Get, server.uri()).build().unwrap();
                let task = RequestTask::new(request, Arc::new(NullHandler), "bound#test");
                let _ = processor.enqueue(task);
            }

            tokio::time::sleep(Duration::from_millis(work_delay_ms + 100)).await;
            stop_polling.store(true, Ordering::SeqCst);
            let _ = poller.await;

            prop_assert!(
                observed_max_in_flight.load(Ordering::SeqCst) <= max_concurrent,
                "in_flight_count exceeded max_concurrent_requests"
            );
            prop_assert!(
                observed_max_total.load(Ordering::SeqCst) <= max_concurrent + max_queue,
                "queue_len + in_flight_count exceeded max_concurrent_requests + max_queue_size"
            );
            Ok(())
        })?;
    }
}
