//! Ordered multi-endpoint failover pool.
//!
//! Each query is retried against one endpoint until that endpoint's retry
//! budget is spent, then the pool pauses briefly and moves to the next one.
//! The pool remembers the last endpoint that answered, so once the primary
//! has been abandoned the rest of the scan call goes straight to the
//! fallback instead of paying the primary's retry budget again.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use url::Url;

use crate::endpoint::Endpoint;
use crate::error::{ScanError, TransportError};
use crate::policy::RetryPolicy;

/// Configuration for the endpoint pool.
#[derive(Debug, Clone)]
pub struct EndpointPoolConfig {
    /// Pause before moving on to the next endpoint.
    pub switch_pause: Duration,
}

impl Default for EndpointPoolConfig {
    fn default() -> Self {
        Self {
            switch_pause: Duration::from_millis(300),
        }
    }
}

/// Keep every candidate that is a well-formed absolute `http(s)` URL.
///
/// Order is preserved; blank, malformed and duplicate entries are dropped.
/// Fails with [`ScanError::Config`] when nothing usable remains.
pub fn parse_endpoint_urls<S: AsRef<str>>(candidates: &[S]) -> Result<Vec<Url>, ScanError> {
    let mut urls: Vec<Url> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let raw = candidate.as_ref().trim();
        if raw.is_empty() {
            continue;
        }
        match Url::parse(raw) {
            Ok(url)
                if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() =>
            {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
            Ok(url) => tracing::debug!(scheme = url.scheme(), "dropping non-http endpoint"),
            Err(e) => tracing::debug!(error = %e, "dropping malformed endpoint URL"),
        }
    }
    if urls.is_empty() {
        return Err(ScanError::Config(
            "no valid http(s) RPC endpoint configured".into(),
        ));
    }
    Ok(urls)
}

/// Ordered endpoint list with sticky failover.
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
    active: AtomicUsize,
    config: EndpointPoolConfig,
}

impl EndpointPool {
    /// Build a pool; the first endpoint is the primary.
    pub fn new(endpoints: Vec<Endpoint>, config: EndpointPoolConfig) -> Result<Self, ScanError> {
        if endpoints.is_empty() {
            return Err(ScanError::Config("endpoint pool is empty".into()));
        }
        Ok(Self {
            endpoints,
            active: AtomicUsize::new(0),
            config,
        })
    }

    /// Number of endpoints in the pool.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Always `false`; construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Index of the endpoint the next query starts with.
    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Run `op` against the active endpoint under `policy`, failing over to
    /// the following endpoints in order once an endpoint's retries are spent.
    ///
    /// Every endpoint is tried at most once per call. Returns the last error
    /// if all of them fail.
    pub async fn with_failover<T, F, Fut>(
        &self,
        label: &str,
        policy: &RetryPolicy,
        op: F,
    ) -> Result<T, TransportError>
    where
        F: Fn(Endpoint) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let n = self.endpoints.len();
        let first = self.active_index() % n;
        let mut last_err = None;

        for step in 0..n {
            let idx = (first + step) % n;
            let endpoint = &self.endpoints[idx];
            if step > 0 {
                tokio::time::sleep(self.config.switch_pause).await;
                tracing::warn!(
                    label,
                    from = self.endpoints[(idx + n - 1) % n].url(),
                    to = endpoint.url(),
                    "failing over to next endpoint"
                );
            }
            match policy.run(label, || op(endpoint.clone())).await {
                Ok(value) => {
                    self.active.store(idx, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(e) => last_err = Some(e),
            }
        }

        tracing::error!(label, endpoints = n, "all endpoints exhausted");
        Err(last_err.unwrap_or_else(|| TransportError::Other("endpoint pool is empty".into())))
    }
}

impl std::fmt::Debug for EndpointPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointPool")
            .field("endpoints", &self.endpoints)
            .field("active", &self.active_index())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ErrorClassifier, RetryConfig};
    use crate::request::{JsonRpcRequest, JsonRpcResponse};
    use crate::transport::RpcTransport;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    struct MockTransport {
        url: String,
        should_fail: bool,
        calls: AtomicU32,
    }

    #[async_trait]
    impl RpcTransport for MockTransport {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(TransportError::Http(format!("{} down", self.url)))
            } else {
                Ok(JsonRpcResponse::success(req.id, Value::String("0x1".into())))
            }
        }
        fn url(&self) -> &str {
            &self.url
        }
    }

    fn mock(url: &str, fail: bool) -> Arc<MockTransport> {
        Arc::new(MockTransport { url: url.to_string(), should_fail: fail, calls: AtomicU32::new(0) })
    }

    fn pool(mocks: &[Arc<MockTransport>]) -> EndpointPool {
        let endpoints = mocks
            .iter()
            .map(|m| Endpoint::new(m.clone() as Arc<dyn RpcTransport>))
            .collect();
        EndpointPool::new(endpoints, EndpointPoolConfig::default()).unwrap()
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig {
                max_retries,
                generic_delay: Duration::from_millis(10),
                rate_limit_delay: Duration::from_millis(10),
            },
            ErrorClassifier::default(),
        )
    }

    #[test]
    fn parse_urls_keeps_order_and_drops_junk() {
        let urls = parse_endpoint_urls(&[
            "https://primary.example/rpc",
            "",
            "not a url",
            "ftp://files.example",
            "http://fallback.example:8545",
            "https://primary.example/rpc",
        ])
        .unwrap();
        let urls: Vec<&str> = urls.iter().map(Url::as_str).collect();
        assert_eq!(urls, vec!["https://primary.example/rpc", "http://fallback.example:8545/"]);
    }

    #[test]
    fn parse_urls_empty_is_config_error() {
        let err = parse_endpoint_urls(&["", "  ", "mailto:ops@example.com"]).unwrap_err();
        assert!(err.is_config());
        let none: [&str; 0] = [];
        assert!(parse_endpoint_urls(&none).unwrap_err().is_config());
    }

    #[test]
    fn empty_pool_is_rejected() {
        let err = EndpointPool::new(vec![], EndpointPoolConfig::default()).unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test(start_paused = true)]
    async fn primary_answers_first() {
        let (a, b) = (mock("https://a.com", false), mock("https://b.com", false));
        let pool = pool(&[a.clone(), b.clone()]);
        let n = pool
            .with_failover("tip", &policy(3), |ep| async move { ep.block_number().await })
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fails_over_after_retry_budget_and_sticks() {
        let (a, b) = (mock("https://a.com", true), mock("https://b.com", false));
        let pool = pool(&[a.clone(), b.clone()]);
        let p = policy(2);

        pool.with_failover("tip", &p, |ep| async move { ep.block_number().await })
            .await
            .unwrap();
        assert_eq!(a.calls.load(Ordering::SeqCst), 3);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pool.active_index(), 1);

        pool.with_failover("tip", &p, |ep| async move { ep.block_number().await })
            .await
            .unwrap();
        assert_eq!(a.calls.load(Ordering::SeqCst), 3, "abandoned endpoint not retried");
        assert_eq!(b.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn all_down_returns_last_error() {
        let (a, b) = (mock("https://a.com", true), mock("https://b.com", true));
        let pool = pool(&[a.clone(), b.clone()]);
        let err = pool
            .with_failover("tip", &policy(1), |ep| async move { ep.block_number().await })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP error: https://b.com down");
        assert_eq!(a.calls.load(Ordering::SeqCst), 2);
        assert_eq!(b.calls.load(Ordering::SeqCst), 2);
    }
}
