//! Cache-first fetching with per-attempt timeouts and bounded retries.
//!
//! [`Fetcher::fetch`] resolves a URL in this order:
//!
//! 1. a cache hit is returned as-is (no network call, no timeout, no retry);
//! 2. otherwise the transport is called up to `max_retries + 1` times;
//!    4xx responses are handed back untouched after one call, raised
//!    transport errors, timeouts and other non-ok statuses are retried;
//! 3. the first 2xx body is written to the cache and returned.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use super::cache::ResponseCache;
use super::retry::{RetryConfig, TransientError};
use crate::error::KakenError;

/// What the transport hands back for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lower-cased names)
    pub headers: HashMap<String, String>,
    /// Body decoded as text
    pub body: String,
}

impl TransportResponse {
    /// Response with no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// Errors raised by a transport
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Body could not be read
    #[error("Body error: {0}")]
    Body(String),
}

/// Injectable request primitive
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Perform a GET against `url`
    async fn request(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// Response resolved by [`Fetcher::fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    /// Served from the response cache
    pub from_cache: bool,
}

impl RawResponse {
    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Resilient fetch orchestrator
#[derive(Debug, Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
    retry: RetryConfig,
    timeout: Duration,
}

impl Fetcher {
    /// Create a fetcher over `transport`
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: ResponseCache,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            cache,
            retry,
            timeout,
        }
    }

    /// The cache this fetcher reads and writes
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Resolve `url` through the cache or the network
    pub async fn fetch(&self, url: &str) -> Result<RawResponse, KakenError> {
        if let Some(bytes) = self.cache.get(url) {
            return Ok(RawResponse {
                status: 200,
                body: String::from_utf8_lossy(&bytes).into_owned(),
                from_cache: true,
            });
        }

        let attempts = self.retry.total_attempts();
        let mut last_error = TransientError::Network("no attempt made".to_string());

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.retry.delay_for_retry(attempt - 1);
                tracing::debug!(
                    "Retrying {} in {:?} (attempt {}/{}) after {}",
                    url,
                    delay,
                    attempt,
                    attempts,
                    last_error
                );
                sleep(delay).await;
            }

            match timeout(self.timeout, self.transport.request(url)).await {
                Ok(Ok(response)) if response.is_success() => {
                    if attempt > 1 {
                        tracing::info!(
                            "Request succeeded on attempt {} after {} transient failures",
                            attempt,
                            attempt - 1
                        );
                    }
                    self.cache.set(url, response.body.as_bytes());
                    return Ok(RawResponse {
                        status: response.status,
                        body: response.body,
                        from_cache: false,
                    });
                }
                Ok(Ok(response)) if response.is_client_error() => {
                    tracing::debug!("Client error {} for {}, not retrying", response.status, url);
                    return Ok(RawResponse {
                        status: response.status,
                        body: response.body,
                        from_cache: false,
                    });
                }
                Ok(Ok(response)) => last_error = TransientError::Status(response.status),
                Ok(Err(e)) => last_error = TransientError::Network(e.to_string()),
                Err(_) => last_error = TransientError::Timeout(self.timeout),
            }
        }

        tracing::warn!(
            "Request to {} failed after {} attempts: {}",
            url,
            attempts,
            last_error
        );
        Err(KakenError::Request {
            message: last_error.to_string(),
            status: last_error.status(),
        })
    }
}

/// Scripted transport for tests
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// One scripted reply
    #[derive(Debug, Clone)]
    pub enum Reply {
        Respond(u16, String),
        Fail(String),
        /// Respond only after the given delay
        Slow(Duration, u16, String),
    }

    /// Transport that replays a queue of replies, repeating the last one
    #[derive(Debug, Default)]
    pub struct MockTransport {
        replies: Mutex<VecDeque<Reply>>,
        calls: AtomicUsize,
    }

    impl MockTransport {
        pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_reply(&self) -> Reply {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front().unwrap()
            } else {
                replies
                    .front()
                    .cloned()
                    .unwrap_or_else(|| Reply::Fail("no scripted reply".to_string()))
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn request(&self, _url: &str) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.next_reply() {
                Reply::Respond(status, body) => Ok(TransportResponse::new(status, body)),
                Reply::Fail(msg) => Err(TransportError::Network(msg)),
                Reply::Slow(delay, status, body) => {
                    sleep(delay).await;
                    Ok(TransportResponse::new(status, body))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockTransport, Reply};
    use super::*;
    use tempfile::TempDir;

    const URL: &str = "https://kaken.nii.ac.jp/opensearch/?kw=test";

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig::default()
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(4))
    }

    fn fetcher(
        transport: &Arc<MockTransport>,
        cache: ResponseCache,
        max_retries: u32,
    ) -> Fetcher {
        Fetcher::new(
            transport.clone(),
            cache,
            fast_retry(max_retries),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_success_first_try_writes_cache() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(temp_dir.path());
        let transport = Arc::new(MockTransport::new([Reply::Respond(200, "ok".into())]));

        let response = fetcher(&transport, cache.clone(), 3).fetch(URL).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");
        assert!(!response.from_cache);
        assert_eq!(transport.calls(), 1);
        assert_eq!(cache.get(URL).as_deref(), Some(&b"ok"[..]));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_transport() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(temp_dir.path());
        cache.set(URL, b"cached body");
        let transport = Arc::new(MockTransport::new([Reply::Fail("down".into())]));

        let response = fetcher(&transport, cache, 3).fetch(URL).await.unwrap();

        assert!(response.from_cache);
        assert_eq!(response.body, "cached body");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let transport = Arc::new(MockTransport::new([
            Reply::Fail("connection reset".into()),
            Reply::Respond(503, "busy".into()),
            Reply::Respond(200, "finally".into()),
        ]));

        let response = fetcher(&transport, ResponseCache::disabled(), 3)
            .fetch(URL)
            .await
            .unwrap();

        assert_eq!(response.body, "finally");
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_before_each_retry() {
        let transport = Arc::new(MockTransport::new([Reply::Fail("refused".into())]));
        let base = Duration::from_millis(100);
        let fetcher = Fetcher::new(
            transport.clone(),
            ResponseCache::disabled(),
            RetryConfig::default()
                .max_retries(2)
                .initial_delay(base)
                .max_delay(Duration::from_secs(10)),
            Duration::from_secs(1),
        );

        let started = tokio::time::Instant::now();
        assert!(fetcher.fetch(URL).await.is_err());

        assert_eq!(transport.calls(), 3);
        assert_eq!(started.elapsed(), base + 2 * base);
    }

    #[tokio::test]
    async fn test_exhaustion_raises_last_error() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(temp_dir.path());
        let transport = Arc::new(MockTransport::new([
            Reply::Fail("refused".into()),
            Reply::Respond(502, "bad gateway".into()),
        ]));

        let err = fetcher(&transport, cache.clone(), 2)
            .fetch(URL)
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 3);
        match err {
            KakenError::Request { status, message } => {
                assert_eq!(status, Some(502));
                assert!(message.contains("502"));
            }
            other => panic!("Expected request error, got {:?}", other),
        }
        assert!(cache.get(URL).is_none());
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(temp_dir.path());
        let transport = Arc::new(MockTransport::new([Reply::Respond(404, "missing".into())]));

        let response = fetcher(&transport, cache.clone(), 5).fetch(URL).await.unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.body, "missing");
        assert_eq!(transport.calls(), 1);
        assert!(cache.get(URL).is_none());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_retryable() {
        let transport = Arc::new(MockTransport::new([
            Reply::Slow(Duration::from_secs(5), 200, "too late".into()),
            Reply::Respond(200, "in time".into()),
        ]));
        let fetcher = Fetcher::new(
            transport.clone(),
            ResponseCache::disabled(),
            fast_retry(1),
            Duration::from_millis(20),
        );

        let response = fetcher.fetch(URL).await.unwrap();
        assert_eq!(response.body, "in time");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_error_after_exhaustion() {
        let transport = Arc::new(MockTransport::new([Reply::Slow(
            Duration::from_secs(5),
            200,
            "never".into(),
        )]));
        let fetcher = Fetcher::new(
            transport.clone(),
            ResponseCache::disabled(),
            fast_retry(1),
            Duration::from_millis(20),
        );

        let err = fetcher.fetch(URL).await.unwrap_err();
        assert_eq!(transport.calls(), 2);
        assert!(err.to_string().contains("timed out"));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let transport = Arc::new(MockTransport::new([Reply::Fail("down".into())]));
        let result = fetcher(&transport, ResponseCache::disabled(), 0)
            .fetch(URL)
            .await;
        assert!(result.is_err());
        assert_eq!(transport.calls(), 1);
    }
}
