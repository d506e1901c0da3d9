//! `ClientPool` — maps an origin to a long-lived, pooled `reqwest::Client`.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;

/// How many consecutive transport failures retire a client from the
/// pool, forcing a fresh one (and fresh connections) on the next lookup.
///
/// Grounded on `tower_resilience_circuitbreaker::circuit::Circuit`'s
/// consecutive-failure bookkeeping, scaled down to a plain counter: the
/// pool doesn't need a half-open probe state, just "give up on this
/// connection set and start over."
const DEFAULT_FAILURE_RETIREMENT_THRESHOLD: u32 = 5;

/// The `(scheme, host, port)` tuple a client is pooled under.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: u16,
}

impl Origin {
    pub fn from_url(url: &Url) -> Option<Self> {
        let scheme = url.scheme().to_string();
        let host = url.host_str()?.to_string();
        let port = url.port_or_known_default()?;
        Some(Self { scheme, host, port })
    }
}

struct PooledClient {
    client: reqwest::Client,
    last_used: Instant,
    consecutive_failures: AtomicU32,
}

impl PooledClient {
    fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            last_used: Instant::now(),
            consecutive_failures: AtomicU32::new(0),
        }
    }
}

/// Errors constructing a pooled client.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("could not build an http client: {0}")]
    BuildFailed(#[from] reqwest::Error),
    #[error("url has no resolvable origin")]
    NoOrigin,
}

/// Origin-keyed LRU cache of `reqwest::Client`s, capped at `max_clients`
/// and evicting the least-recently-used origin when full.
///
/// Grounded on `tower_cache::store::CacheStore` for the `lru`-crate
/// usage pattern (bounded map, push returns the eviction).
pub struct ClientPool {
    entries: Mutex<LruCache<Origin, PooledClient>>,
    idle_timeout: Duration,
    failure_retirement_threshold: u32,
    user_agent: Option<String>,
    proxy: Option<Url>,
}

impl ClientPool {
    pub fn new(max_clients: usize, idle_timeout: Duration) -> Self {
        Self::with_retirement_threshold(
            max_clients,
            idle_timeout,
            DEFAULT_FAILURE_RETIREMENT_THRESHOLD,
        )
    }

    pub fn with_retirement_threshold(
        max_clients: usize,
        idle_timeout: Duration,
        failure_retirement_threshold: u32,
    ) -> Self {
        let cap = NonZeroUsize::new(max_clients).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            idle_timeout,
            failure_retirement_threshold,
            user_agent: None,
            proxy: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_proxy(mut self, proxy: Url) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Returns the pooled client for `url`'s origin, constructing and
    /// inserting one if absent or retired.
    pub fn get(&self, url: &Url) -> Result<reqwest::Client, PoolError> {
        let origin = Origin::from_url(url).ok_or(PoolError::NoOrigin)?;
        let mut entries = self.entries.lock().unwrap();

        if let Some(pooled) = entries.get_mut(&origin) {
            let retired = pooled.consecutive_failures.load(Ordering::Relaxed)
                >= self.failure_retirement_threshold;
            let idle_expired = pooled.last_used.elapsed() > self.idle_timeout;
            if !retired && !idle_expired {
                pooled.last_used = Instant::now();
                return Ok(pooled.client.clone());
            }
        }

        let client = self.build_client()?;
        entries.put(origin, PooledClient::new(client.clone()));
        Ok(client)
    }

    fn build_client(&self) -> Result<reqwest::Client, PoolError> {
        // Redirects are followed by offload-processor::execute.rs's own loop
        // (recursive-redirect detection, max_redirects, method/body downgrade,
        // cross-origin Authorization stripping) — reqwest must never chase
        // them itself or that loop never sees a 3xx response.
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        if let Some(proxy_url) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.clone())?);
        }
        Ok(builder.build()?)
    }

    /// Records a transport failure against the origin's pooled entry so
    /// repeated failures eventually retire it.
    pub fn record_failure(&self, url: &Url) {
        let Some(origin) = Origin::from_url(url) else {
            return;
        };
        let entries = self.entries.lock().unwrap();
        if let Some(pooled) = entries.peek(&origin) {
            pooled.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_success(&self, url: &Url) {
        let Some(origin) = Origin::from_url(url) else {
            return;
        };
        let entries = self.entries.lock().unwrap();
        if let Some(pooled) = entries.peek(&origin) {
            pooled.consecutive_failures.store(0, Ordering::Relaxed);
        }
    }

    /// Evicts every entry idle past `idle_timeout`. Called periodically
    /// by the processor and once more while entering `stopping`.
    pub fn sweep_idle(&self) {
        let mut entries = self.entries.lock().unwrap();
        let stale: Vec<Origin> = entries
            .iter()
            .filter(|(_, pooled)| pooled.last_used.elapsed() > self.idle_timeout)
            .map(|(origin, _)| origin.clone())
            .collect();
        for origin in stale {
            entries.pop(&origin);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}

impl std::fmt::Debug for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}
