//! HTTP JSON-RPC client backed by `reqwest`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use chainscan_core::error::{ScanError, TransportError};
use chainscan_core::pool::{parse_endpoint_urls, EndpointPool, EndpointPoolConfig};
use chainscan_core::request::{JsonRpcRequest, JsonRpcResponse};
use chainscan_core::transport::RpcTransport;
use chainscan_core::Endpoint;

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout covering connect, send and body read.
    pub request_timeout: Duration,
    /// Longest error body kept in a [`TransportError::Status`].
    pub max_error_body: usize,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(20),
            max_error_body: 512,
            user_agent: concat!("chainscan/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Single-shot HTTP JSON-RPC client.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    max_error_body: usize,
}

impl HttpRpcClient {
    /// Create a new client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: &HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            max_error_body: config.max_error_body,
        })
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        tracing::trace!(url = %self.url, method = %req.method, "sending request");
        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate(&body, self.max_error_body),
            });
        }

        serde_json::from_str::<JsonRpcResponse>(&body).map_err(|e| {
            TransportError::Malformed(format!(
                "{e}: {}",
                truncate(&body, self.max_error_body)
            ))
        })
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Build an [`EndpointPool`] of HTTP clients from candidate URL strings.
///
/// Candidates are filtered with [`parse_endpoint_urls`]; order is kept as
/// the failover order.
pub fn http_pool<S: AsRef<str>>(
    candidates: &[S],
    config: &HttpClientConfig,
    pool_config: EndpointPoolConfig,
) -> Result<EndpointPool, ScanError> {
    let urls = parse_endpoint_urls(candidates)?;
    let mut endpoints = Vec::with_capacity(urls.len());
    for url in urls {
        let client = HttpRpcClient::new(url.as_str(), config)?;
        endpoints.push(Endpoint::new(Arc::new(client) as Arc<dyn RpcTransport>));
    }
    EndpointPool::new(endpoints, pool_config)
}

fn truncate(body: &str, max: usize) -> String {
    let body = body.trim();
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("  short  ", 16), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(truncate("aé-rest", 2), "a…");
    }

    #[test]
    fn pool_from_urls_keeps_order() {
        let pool = http_pool(
            &["https://primary.example/rpc", "junk", "https://fallback.example/rpc"],
            &HttpClientConfig::default(),
            EndpointPoolConfig::default(),
        )
        .unwrap();
        let urls: Vec<&str> = pool.endpoints().iter().map(|e| e.url()).collect();
        assert_eq!(urls, vec!["https://primary.example/rpc", "https://fallback.example/rpc"]);
    }

    #[test]
    fn pool_without_usable_urls_is_config_error() {
        let err = http_pool(&["", "ws://node:8546"], &HttpClientConfig::default(), Default::default())
            .unwrap_err();
        assert!(err.is_config());
    }
}
