//! `ProcessorConfig` — the full set of recognized options from spec.md §6.
//!
//! Grounded on `tower_resilience_retry::config::RetryConfigBuilder`: a
//! many-field builder with documented defaults and a `.build()` that
//! assembles the immutable config.

use offload_storage::PayloadStore;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 200;
const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;
const DEFAULT_MAX_CLIENTS: usize = 100;
const DEFAULT_MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_REDIRECTS: u32 = 5;
const DEFAULT_TRANSPORT_RETRIES: u32 = 2;
const DEFAULT_CONNECTION_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_EXTERNAL_PAYLOAD_THRESHOLD: u64 = u64::MAX;

/// Errors raised while building a [`ProcessorConfig`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("max_concurrent_requests must be greater than zero")]
    ZeroConcurrency,
    #[error("invalid proxy url: {0}")]
    InvalidProxy(String),
}

/// The assembled, immutable configuration a [`crate::Processor`] or
/// [`crate::SynchronousExecutor`] is built from.
#[derive(Clone)]
pub struct ProcessorConfig {
    pub max_concurrent_requests: usize,
    pub max_queue_size: usize,
    pub max_clients: usize,
    pub max_response_size: u64,
    pub default_timeout: Duration,
    pub default_max_redirects: u32,
    pub transport_retries: u32,
    pub user_agent: Option<String>,
    pub proxy: Option<Url>,
    pub drain_timeout: Duration,
    pub connection_idle_timeout: Duration,
    pub payload_store: Option<Arc<dyn PayloadStore>>,
    pub external_payload_threshold: u64,
    pub raise_error_responses: bool,
}

impl ProcessorConfig {
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }
}

/// Builder for [`ProcessorConfig`].
///
/// Defaults:
/// - `max_concurrent_requests`: 200
/// - `max_queue_size`: 1000
/// - `max_clients`: 100
/// - `max_response_size`: 10 MiB
/// - `default_timeout`: 30s
/// - `default_max_redirects`: 5
/// - `transport_retries`: 2
/// - `drain_timeout`: 30s
/// - `connection_idle_timeout`: 90s
/// - `external_payload_threshold`: unbounded (offload disabled)
/// - `raise_error_responses`: false
pub struct ProcessorConfigBuilder {
    max_concurrent_requests: usize,
    max_queue_size: usize,
    max_clients: usize,
    max_response_size: u64,
    default_timeout: Duration,
    default_max_redirects: u32,
    transport_retries: u32,
    user_agent: Option<String>,
    proxy: Option<String>,
    drain_timeout: Duration,
    connection_idle_timeout: Duration,
    payload_store: Option<Arc<dyn PayloadStore>>,
    external_payload_threshold: u64,
    raise_error_responses: bool,
}

impl ProcessorConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            max_clients: DEFAULT_MAX_CLIENTS,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            default_timeout: DEFAULT_TIMEOUT,
            default_max_redirects: DEFAULT_MAX_REDIRECTS,
            transport_retries: DEFAULT_TRANSPORT_RETRIES,
            user_agent: None,
            proxy: None,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            connection_idle_timeout: DEFAULT_CONNECTION_IDLE_TIMEOUT,
            payload_store: None,
            external_payload_threshold: DEFAULT_EXTERNAL_PAYLOAD_THRESHOLD,
            raise_error_responses: false,
        }
    }

    pub fn max_concurrent_requests(mut self, value: usize) -> Self {
        self.max_concurrent_requests = value;
        self
    }

    pub fn max_queue_size(mut self, value: usize) -> Self {
        self.max_queue_size = value;
        self
    }

    pub fn max_clients(mut self, value: usize) -> Self {
        self.max_clients = value;
        self
    }

    pub fn max_response_size(mut self, value: u64) -> Self {
        self.max_response_size = value;
        self
    }

    pub fn default_timeout(mut self, value: Duration) -> Self {
        self.default_timeout = value;
        self
    }

    pub fn default_max_redirects(mut self, value: u32) -> Self {
        self.default_max_redirects = value;
        self
    }

    pub fn transport_retries(mut self, value: u32) -> Self {
        self.transport_retries = value;
        self
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.user_agent = Some(value.into());
        self
    }

    pub fn proxy(mut self, value: impl Into<String>) -> Self {
        self.proxy = Some(value.into());
        self
    }

    pub fn drain_timeout(mut self, value: Duration) -> Self {
        self.drain_timeout = value;
        self
    }

    pub fn connection_idle_timeout(mut self, value: Duration) -> Self {
        self.connection_idle_timeout = value;
        self
    }

    pub fn payload_store(mut self, store: Arc<dyn PayloadStore>) -> Self {
        self.payload_store = Some(store);
        self
    }

    pub fn external_payload_threshold(mut self, value: u64) -> Self {
        self.external_payload_threshold = value;
        self
    }

    pub fn raise_error_responses(mut self, value: bool) -> Self {
        self.raise_error_responses = value;
        self
    }

    pub fn build(self) -> Result<ProcessorConfig, ConfigError> {
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let proxy = self
            .proxy
            .map(|p| Url::parse(&p).map_err(|e| ConfigError::InvalidProxy(e.to_string())))
            .transpose()?;

        Ok(ProcessorConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            max_queue_size: self.max_queue_size,
            max_clients: self.max_clients,
            max_response_size: self.max_response_size,
            default_timeout: self.default_timeout,
            default_max_redirects: self.default_max_redirects,
            transport_retries: self.transport_retries,
            user_agent: self.user_agent,
            proxy,
            drain_timeout: self.drain_timeout,
            connection_idle_timeout: self.connection_idle_timeout,
            payload_store: self.payload_store,
            external_payload_threshold: self.external_payload_threshold,
            raise_error_responses: self.raise_error_responses,
        })
    }
}

impl Default for ProcessorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
