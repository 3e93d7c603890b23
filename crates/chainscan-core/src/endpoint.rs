//! Typed ledger queries over a single transport.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::TransportError;
use crate::log::{parse_hex_u64, LogFilter, RawLog};
use crate::request::JsonRpcRequest;
use crate::transport::RpcTransport;
use crate::types::{BlockRange, LogRecord};

/// An immutable handle to one backend connection.
///
/// Cloning is cheap; clones share the underlying transport.
#[derive(Clone)]
pub struct Endpoint {
    transport: Arc<dyn RpcTransport>,
}

impl Endpoint {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub fn url(&self) -> &str {
        self.transport.url()
    }

    /// Call a method and deserialize the result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let req = JsonRpcRequest::new(1, method, params);
        let resp = self.transport.send(req).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        serde_json::from_value(result).map_err(TransportError::Deserialization)
    }

    /// Current chain tip height (`eth_blockNumber`).
    pub async fn block_number(&self) -> Result<u64, TransportError> {
        let hex: String = self.call("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&hex)
            .ok_or_else(|| TransportError::Malformed(format!("block number {hex:?}")))
    }

    /// Transfer logs in `range` matching `filter` (`eth_getLogs`).
    ///
    /// Entries that do not decode as transfers are skipped.
    pub async fn logs(
        &self,
        range: BlockRange,
        filter: &LogFilter,
    ) -> Result<Vec<LogRecord>, TransportError> {
        let raw: Vec<RawLog> = self.call("eth_getLogs", vec![filter.to_params(range)]).await?;
        let total = raw.len();
        let records: Vec<LogRecord> = raw.iter().filter_map(RawLog::decode_transfer).collect();
        if records.len() < total {
            tracing::debug!(
                range = %range,
                skipped = total - records.len(),
                "skipped undecodable logs"
            );
        }
        Ok(records)
    }

    /// Timestamp (seconds) of the block with `hash`, or `None` if the node
    /// does not know the block (`eth_getBlockByHash`).
    pub async fn block_timestamp(&self, hash: &str) -> Result<Option<u64>, TransportError> {
        let block: Option<Value> = self
            .call("eth_getBlockByHash", vec![json!(hash), json!(false)])
            .await?;
        let Some(block) = block else {
            return Ok(None);
        };
        let raw = block["timestamp"]
            .as_str()
            .ok_or_else(|| TransportError::Malformed(format!("block {hash} has no timestamp")))?;
        parse_hex_u64(raw)
            .map(Some)
            .ok_or_else(|| TransportError::Malformed(format!("block timestamp {raw:?}")))
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint").field("url", &self.url()).finish()
    }
}
