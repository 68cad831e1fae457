//! Resilient client for the recommendation service
//!
//! All outbound calls go through [`RemoteClient::execute`], which enforces two
//! process-wide guarantees: at most `max_concurrency` calls on the wire (FIFO
//! queueing through a fair semaphore), and at most one outstanding fetch per
//! cacheable key. Cache hits never wait for a slot.

mod cache;
pub mod http;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use stackscout_core::job::JobSnapshot;
use stackscout_core::recommend::{self, StackScore};
use stackscout_core::request::{RemoteRequest, BLUEPRINTS_PATH, SCORE_PATH};
use stackscout_core::scoring::Context;
use stackscout_core::ScoutError;
use tokio::sync::Semaphore;

use crate::config::Config;
use cache::{Lookup, ResponseCache, SharedFetch};

pub use http::HttpTransport;

/// Status, body and `Retry-After` of a finished HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub retry_after: Option<u64>,
}

#[cfg(test)]
impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            retry_after: None,
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }
}

/// Wire seam between the client and the network.
///
/// Only connection-level failures are errors here; every HTTP status comes
/// back as a [`RawResponse`] and is mapped by the client.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: &RemoteRequest) -> Result<RawResponse, ScoutError>;
}

#[async_trait]
impl<T: Transport> Transport for Arc<T> {
    async fn send(&self, request: &RemoteRequest) -> Result<RawResponse, ScoutError> {
        self.as_ref().send(request).await
    }
}

struct Inner<T> {
    transport: T,
    limiter: Semaphore,
    cache: Mutex<ResponseCache>,
    timeout: Duration,
}

impl<T: Transport> Inner<T> {
    fn lock_cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// One outbound call: wait for a slot, send under the deadline, map the status
    async fn dispatch(&self, request: &RemoteRequest) -> Result<Value, ScoutError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| ScoutError::Internal(format!("Concurrency limiter closed: {e}")))?;

        log::debug!("{} {}", request.method, request.path);

        let response = tokio::time::timeout(self.timeout, self.transport.send(request))
            .await
            .map_err(|_| ScoutError::Timeout {
                operation: format!("{} {}", request.method, request.path),
                after_ms: self.timeout.as_millis() as u64,
            })??;

        if !(200..300).contains(&response.status) {
            let error =
                ScoutError::from_status(response.status, &response.body, response.retry_after);
            log::warn!(
                "{} {} failed with HTTP {}: {error}",
                request.method,
                request.path,
                response.status
            );
            return Err(error);
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response.body).map_err(|e| ScoutError::Upstream {
            status: Some(response.status),
            message: format!("Response is not valid JSON: {e}"),
        })
    }
}

/// Cloning is cheap and every clone shares the limiter and the cache
pub struct RemoteClient<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for RemoteClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> RemoteClient<T> {
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                limiter: Semaphore::new(config.max_concurrency.max(1)),
                cache: Mutex::new(ResponseCache::new(config.cache_ttl, config.cache_capacity)),
                timeout: config.timeout,
            }),
        }
    }

    /// Send a request, serving cacheable ones from the cache or from an
    /// identical fetch already on the wire
    pub async fn execute(&self, request: RemoteRequest) -> Result<Value, ScoutError> {
        if !request.is_cacheable() {
            return self.inner.dispatch(&request).await;
        }

        let key = request.canonical_key();
        let fetch = {
            let mut cache = self.inner.lock_cache();
            match cache.lookup(&key, Instant::now()) {
                Lookup::Hit(value) => {
                    log::debug!("cache hit for {} {}", request.method, request.path);
                    return Ok(value);
                }
                Lookup::Pending(fetch) => {
                    log::debug!("joining in-flight {} {}", request.method, request.path);
                    fetch
                }
                Lookup::Miss => {
                    log::debug!("cache miss for {} {}", request.method, request.path);
                    self.start_fetch(&mut cache, key, request)
                }
            }
        };

        fetch.await
    }

    /// Spawn the fetch so it settles the slot even if every waiter goes away.
    /// Called with the cache lock held, so the task cannot settle before its
    /// slot exists.
    fn start_fetch(
        &self,
        cache: &mut ResponseCache,
        key: String,
        request: RemoteRequest,
    ) -> SharedFetch {
        let inner = Arc::clone(&self.inner);
        let (generation_tx, generation_rx) = tokio::sync::oneshot::channel::<u64>();
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let result = inner.dispatch(&request).await;
            // The sender lives until begin() returns below
            let Ok(generation) = generation_rx.await else {
                return result;
            };
            let mut cache = inner.lock_cache();
            match &result {
                Ok(value) => cache.complete(&task_key, generation, value.clone(), Instant::now()),
                Err(_) => cache.abandon(&task_key, generation),
            }
            result
        });

        let fetch = async move {
            handle.await.unwrap_or_else(|e| {
                Err(ScoutError::Internal(format!("Remote fetch task failed: {e}")))
            })
        }
        .boxed()
        .shared();

        let generation = cache.begin(&key, fetch.clone());
        let _ = generation_tx.send(generation);
        fetch
    }

    /// Forget every cached response and in-flight slot
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn reset(&self) {
        self.inner.lock_cache().clear();
    }

    #[cfg(test)]
    pub fn cached_entries(&self) -> usize {
        self.inner.lock_cache().len()
    }

    // ============================================================================
    // Typed endpoints
    // ============================================================================

    /// Score a stack on the server; identical requests are cached
    pub async fn score(&self, ids: &[String], context: Context) -> Result<StackScore, ScoutError> {
        let body = recommend::score_request_body(ids, context);
        let value = self
            .execute(RemoteRequest::post(SCORE_PATH, body).cacheable())
            .await?;
        StackScore::from_value(value)
    }

    /// Create a blueprint job
    pub async fn submit_blueprint(&self, body: Value) -> Result<JobSnapshot, ScoutError> {
        let value = self.execute(RemoteRequest::post(BLUEPRINTS_PATH, body)).await?;
        JobSnapshot::from_value(value)
    }

    /// Current job state; never served from the cache
    pub async fn job_status(&self, path: &str) -> Result<JobSnapshot, ScoutError> {
        let value = self
            .execute(RemoteRequest::get(path).bypass_cache())
            .await?;
        JobSnapshot::from_value(value)
    }

    /// Fetch a completed job's result by reference
    pub async fn fetch_result(&self, reference: &str) -> Result<Value, ScoutError> {
        self.execute(RemoteRequest::get(reference)).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use stackscout_core::request::Method;
    use stackscout_core::ErrorKind;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted transport: responses per path (the last one repeats),
    /// optional per-path delays, call and concurrency counters
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        responses: Mutex<HashMap<String, Vec<RawResponse>>>,
        delays: HashMap<String, Duration>,
        pub calls: AtomicUsize,
        active: AtomicUsize,
        pub max_active: AtomicUsize,
        pub seen: Mutex<Vec<(Method, String)>>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(self, path: &str, responses: Vec<RawResponse>) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(path.to_string(), responses);
            self
        }

        pub(crate) fn delay(mut self, path: &str, delay: Duration) -> Self {
            self.delays.insert(path.to_string(), delay);
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn calls_to(&self, path: &str) -> usize {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, p)| p == path)
                .count()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: &RemoteRequest) -> Result<RawResponse, ScoutError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((request.method, request.path.clone()));

            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);

            if let Some(delay) = self.delays.get(&request.path) {
                tokio::time::sleep(*delay).await;
            }

            let response = {
                let mut responses = self.responses.lock().unwrap();
                match responses.get_mut(&request.path) {
                    Some(queue) if queue.len() > 1 => queue.remove(0),
                    Some(queue) if queue.len() == 1 => queue[0].clone(),
                    _ => RawResponse::status(404, r#"{"message":"no route"}"#),
                }
            };

            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(response)
        }
    }

    pub(crate) fn test_config() -> Config {
        let mut config = Config::new("https://api.test", Some("key".to_string())).unwrap();
        config.timeout = Duration::from_millis(500);
        config
    }

    fn client(transport: &Arc<FakeTransport>, config: &Config) -> RemoteClient<Arc<FakeTransport>> {
        RemoteClient::new(Arc::clone(transport), config)
    }

    // ============================================================================
    // Coalescing and caching
    // ============================================================================

    #[tokio::test]
    async fn test_concurrent_identical_requests_share_one_call() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("/v1/things", vec![RawResponse::ok(r#"{"n":1}"#)])
                .delay("/v1/things", Duration::from_millis(50)),
        );
        let client = client(&transport, &test_config());

        let (a, b) = tokio::join!(
            client.execute(RemoteRequest::get("/v1/things")),
            client.execute(RemoteRequest::get("/v1/things")),
        );

        assert_eq!(a.unwrap(), json!({"n": 1}));
        assert_eq!(b.unwrap(), json!({"n": 1}));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_coalesced_failure_reaches_every_waiter_and_is_not_cached() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond(
                    "/v1/things",
                    vec![
                        RawResponse::status(500, r#"{"message":"boom"}"#),
                        RawResponse::ok("{}"),
                    ],
                )
                .delay("/v1/things", Duration::from_millis(30)),
        );
        let client = client(&transport, &test_config());

        let (a, b) = tokio::join!(
            client.execute(RemoteRequest::get("/v1/things")),
            client.execute(RemoteRequest::get("/v1/things")),
        );
        assert_eq!(a.unwrap_err().kind(), ErrorKind::UpstreamApiError);
        assert_eq!(b.unwrap_err().kind(), ErrorKind::UpstreamApiError);
        assert_eq!(transport.calls(), 1);
        assert_eq!(client.cached_entries(), 0);

        assert!(client.execute(RemoteRequest::get("/v1/things")).await.is_ok());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let transport =
            Arc::new(FakeTransport::new().respond("/v1/things", vec![RawResponse::ok("[1,2]")]));
        let client = client(&transport, &test_config());

        client.execute(RemoteRequest::get("/v1/things")).await.unwrap();
        let cached = client.execute(RemoteRequest::get("/v1/things")).await.unwrap();

        assert_eq!(cached, json!([1, 2]));
        assert_eq!(transport.calls(), 1);
        assert_eq!(client.cached_entries(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_wait_for_a_slot() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("/v1/cached", vec![RawResponse::ok("true")])
                .respond("/v1/slow", vec![RawResponse::ok("false")])
                .delay("/v1/slow", Duration::from_millis(300)),
        );
        let mut config = test_config();
        config.max_concurrency = 1;
        let client = client(&transport, &config);

        client.execute(RemoteRequest::get("/v1/cached")).await.unwrap();

        let slow_client = client.clone();
        let slow = tokio::spawn(async move {
            slow_client
                .execute(RemoteRequest::get("/v1/slow").bypass_cache())
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let hit = tokio::time::timeout(
            Duration::from_millis(100),
            client.execute(RemoteRequest::get("/v1/cached")),
        )
        .await
        .expect("cache hit waited for the busy slot");
        assert_eq!(hit.unwrap(), json!(true));

        slow.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bypass_requests_are_never_cached() {
        let transport = Arc::new(FakeTransport::new().respond(
            "/v1/jobs/j1",
            vec![RawResponse::ok(r#"{"id":"j1","status":"running"}"#)],
        ));
        let client = client(&transport, &test_config());

        client.job_status("/v1/jobs/j1").await.unwrap();
        client.job_status("/v1/jobs/j1").await.unwrap();

        assert_eq!(transport.calls(), 2);
        assert_eq!(client.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_cache() {
        let transport =
            Arc::new(FakeTransport::new().respond("/v1/things", vec![RawResponse::ok("1")]));
        let client = client(&transport, &test_config());

        client.execute(RemoteRequest::get("/v1/things")).await.unwrap();
        client.reset();
        client.execute(RemoteRequest::get("/v1/things")).await.unwrap();

        assert_eq!(transport.calls(), 2);
    }

    // ============================================================================
    // Limiter and timeout
    // ============================================================================

    #[tokio::test]
    async fn test_limiter_caps_concurrent_calls() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("/v1/work", vec![RawResponse::ok("{}")])
                .delay("/v1/work", Duration::from_millis(30)),
        );
        let mut config = test_config();
        config.max_concurrency = 2;
        let client = client(&transport, &config);

        let calls = (0..6).map(|_| client.execute(RemoteRequest::get("/v1/work").bypass_cache()));
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(transport.calls(), 6);
        assert_eq!(transport.max_active.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_releases_the_slot() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("/v1/hang", vec![RawResponse::ok("{}")])
                .respond("/v1/fast", vec![RawResponse::ok(r#""done""#)])
                .delay("/v1/hang", Duration::from_millis(500)),
        );
        let mut config = test_config();
        config.max_concurrency = 1;
        config.timeout = Duration::from_millis(50);
        let client = client(&transport, &config);

        let err = client
            .execute(RemoteRequest::get("/v1/hang"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let fast = client.execute(RemoteRequest::get("/v1/fast")).await.unwrap();
        assert_eq!(fast, json!("done"));
        assert_eq!(client.cached_entries(), 1);
    }

    // ============================================================================
    // Status mapping and endpoints
    // ============================================================================

    #[tokio::test]
    async fn test_status_mapping() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("/401", vec![RawResponse::status(401, "")])
                .respond(
                    "/429",
                    vec![RawResponse {
                        status: 429,
                        body: String::new(),
                        retry_after: Some(12),
                    }],
                )
                .respond("/503", vec![RawResponse::status(503, "down")]),
        );
        let client = client(&transport, &test_config());

        let unauthorized = client.execute(RemoteRequest::get("/401")).await.unwrap_err();
        assert_eq!(unauthorized.kind(), ErrorKind::Unauthorized);

        let limited = client.execute(RemoteRequest::get("/429")).await.unwrap_err();
        assert!(matches!(
            limited,
            ScoutError::RateLimited {
                retry_after: Some(12),
                ..
            }
        ));

        let missing = client.execute(RemoteRequest::get("/nowhere")).await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let upstream = client.execute(RemoteRequest::get("/503")).await.unwrap_err();
        assert!(matches!(
            upstream,
            ScoutError::Upstream {
                status: Some(503),
                ..
            }
        ));
        assert_eq!(client.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_invalid_json_is_upstream_error() {
        let transport =
            Arc::new(FakeTransport::new().respond("/v1/things", vec![RawResponse::ok("<html>")]));
        let client = client(&transport, &test_config());
        let err = client
            .execute(RemoteRequest::get("/v1/things"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamApiError);
    }

    #[tokio::test]
    async fn test_score_is_cached_per_body() {
        let transport = Arc::new(FakeTransport::new().respond(
            SCORE_PATH,
            vec![RawResponse::ok(r#"{"overall": 77, "notes": ["ok"]}"#)],
        ));
        let client = client(&transport, &test_config());
        let ids = vec!["nextjs".to_string(), "postgresql".to_string()];

        let first = client.score(&ids, Context::Mvp).await.unwrap();
        let second = client.score(&ids, Context::Mvp).await.unwrap();
        client.score(&ids, Context::Enterprise).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.overall, 77.0);
        assert_eq!(transport.calls_to(SCORE_PATH), 2);
    }

    #[tokio::test]
    async fn test_submit_blueprint_is_never_cached() {
        let transport = Arc::new(FakeTransport::new().respond(
            BLUEPRINTS_PATH,
            vec![RawResponse::ok(r#"{"job_id":"j9","status":"pending"}"#)],
        ));
        let client = client(&transport, &test_config());

        let job = client.submit_blueprint(json!({"a": 1})).await.unwrap();
        client.submit_blueprint(json!({"a": 1})).await.unwrap();

        assert_eq!(job.id.as_deref(), Some("j9"));
        assert_eq!(transport.calls_to(BLUEPRINTS_PATH), 2);
    }
}
