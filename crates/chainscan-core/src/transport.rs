//! The `RpcTransport` trait, the seam between the scan engine and the wire.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// A single backend connection able to answer JSON-RPC requests.
///
/// Implementations do not retry: retry and failover are layered on top by
/// [`RetryPolicy`](crate::policy::RetryPolicy) and
/// [`EndpointPool`](crate::pool::EndpointPool).
///
/// The trait is object-safe and is stored as `Arc<dyn RpcTransport>`.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Return the transport's identifier (URL or name).
    fn url(&self) -> &str;
}
