//! Metrics regression tests: assert the counter/gauge/histogram names and
//! labels the engine publishes stay stable, the same treatment the
//! teacher's resilience middleware gives its own metrics surface.

use http_offload_engine::OffloadEngine;
use offload_core::{Method, OffloadError, Request, RequestTask, Response, TaskHandler};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{Mock, MockServer, ResponseTemplate};

mod helpers {
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use std::sync::LazyLock;

    static RECORDER: LazyLock<DebuggingRecorder> = LazyLock::new(DebuggingRecorder::default);

    pub fn init_recorder() {
        let _ = metrics::set_global_recorder(&*RECORDER);
    }

    fn snapshot() -> Vec<(
        metrics_util::CompositeKey,
        Option<metrics::Unit>,
        Option<metrics::SharedString>,
        DebugValue,
    )> {
        RECORDER.snapshotter().snapshot().into_vec()
    }

    pub fn assert_counter_exists(name: &str) {
        let found = snapshot()
            .iter()
            .any(|(key, _, _, value)| key.key().name() == name && matches!(value, DebugValue::Counter(_)));
        assert!(found, "expected counter '{name}' not found in metrics");
    }

    pub fn assert_histogram_exists(name: &str) {
        let found = snapshot().iter().any(|(key, _, _, value)| {
            key.key().name() == name && matches!(value, DebugValue::Histogram(_))
        });
        assert!(found, "expected histogram '{name}' not found in metrics");
    }

    pub fn assert_metric_has_label(name: &str, label_key: &str, label_value: &str) {
        let found = snapshot().iter().any(|(key, _, _, _)| {
            let key = key.key();
            key.name() == name
                && key
                    .labels()
                    .any(|label| label.key() == label_key && label.value() == label_value)
        });
        assert!(found, "expected metric '{name}' with label {label_key}='{label_value}' not found");
    }
}

struct DiscardHandler;

#[async_trait::async_trait]
impl TaskHandler for DiscardHandler {
    async fn on_complete(&self, _response: Response, _callback: &str) {}
    async fn on_error(&self, _error: OffloadError, _callback: &str) {}
}

#[tokio::test]
#[serial]
async fn successful_request_emits_counter_and_duration_metrics() {
    helpers::init_recorder();

    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let engine = OffloadEngine::builder().testing(true).build().unwrap();
    let request = Request::builder(Method::Get, server.uri()).build().unwrap();
    engine
        .enqueue(RequestTask::new(request, Arc::new(DiscardHandler), "metrics#success"))
        .await
        .unwrap();

    helpers::assert_counter_exists("offload_requests_total");
    helpers::assert_metric_has_label("offload_requests_total", "outcome", "success");
    helpers::assert_histogram_exists("offload_request_duration_seconds");
}

#[tokio::test]
#[serial]
async fn capacity_rejection_emits_counter() {
    helpers::init_recorder();

    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let engine = OffloadEngine::builder()
        .config(
            offload_processor::ProcessorConfig::builder()
                .max_concurrent_requests(1)
                .max_queue_size(0),
        )
        .build()
        .unwrap();

    let first = Request::builder(Method::Get, server.uri()).build().unwrap();
    engine
        .enqueue(RequestTask::new(first, Arc::new(DiscardHandler), "metrics#cap-a"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = Request::builder(Method::Get, server.uri()).build().unwrap();
    let _ = engine
        .enqueue(RequestTask::new(second, Arc::new(DiscardHandler), "metrics#cap-b"))
        .await;

    helpers::assert_counter_exists("offload_capacity_rejections_total");
    engine.stop().await;
}
