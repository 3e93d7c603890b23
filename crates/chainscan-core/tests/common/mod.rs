//! In-memory JSON-RPC ledger used by the scan scenario tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use chainscan_core::log::{parse_hex_u64, TRANSFER_TOPIC};
use chainscan_core::{
    Endpoint, EndpointPool, EndpointPoolConfig, JsonRpcRequest, JsonRpcResponse, RpcTransport,
    TransportError,
};

pub const TOKEN: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
pub const GENESIS_TIME: u64 = 1_700_000_000;
pub const BLOCK_TIME: u64 = 12;

/// How the mock answers.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Healthy,
    /// Every request fails with this HTTP status.
    AlwaysStatus(u16),
}

pub struct MockLedger {
    url: String,
    tip: u64,
    logs: Vec<Value>,
    behavior: Behavior,
    latency: Duration,
    calls: Mutex<Vec<String>>,
    ranges: Mutex<Vec<(u64, u64)>>,
}

impl MockLedger {
    pub fn new(url: &str, tip: u64) -> Self {
        Self {
            url: url.to_string(),
            tip,
            logs: vec![],
            behavior: Behavior::Healthy,
            latency: Duration::ZERO,
            calls: Mutex::new(vec![]),
            ranges: Mutex::new(vec![]),
        }
    }

    pub fn with_logs(mut self, logs: Vec<Value>) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Every request takes `latency` of (tokio) time to answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| *m == method).count()
    }

    /// `(from, to)` of every `eth_getLogs` call, in order.
    pub fn log_ranges(&self) -> Vec<(u64, u64)> {
        self.ranges.lock().unwrap().clone()
    }

    fn answer(&self, req: &JsonRpcRequest) -> Value {
        match req.method.as_str() {
            "eth_blockNumber" => json!(format!("{:#x}", self.tip)),
            "eth_getLogs" => {
                let from = parse_hex_u64(req.params[0]["fromBlock"].as_str().unwrap()).unwrap();
                let to = parse_hex_u64(req.params[0]["toBlock"].as_str().unwrap()).unwrap();
                self.ranges.lock().unwrap().push((from, to));
                let logs: Vec<Value> = self
                    .logs
                    .iter()
                    .filter(|log| {
                        let n = parse_hex_u64(log["blockNumber"].as_str().unwrap()).unwrap();
                        (from..=to).contains(&n)
                    })
                    .cloned()
                    .collect();
                Value::Array(logs)
            }
            "eth_getBlockByHash" => {
                let hash = req.params[0].as_str().unwrap();
                match self.block_of(hash) {
                    Some(n) => json!({
                        "number": format!("{n:#x}"),
                        "hash": hash,
                        "timestamp": format!("{:#x}", block_time(n)),
                    }),
                    None => Value::Null,
                }
            }
            other => panic!("unexpected method {other}"),
        }
    }

    fn block_of(&self, hash: &str) -> Option<u64> {
        self.logs
            .iter()
            .find(|log| log["blockHash"] == hash)
            .and_then(|log| parse_hex_u64(log["blockNumber"].as_str()?))
    }
}

#[async_trait]
impl RpcTransport for MockLedger {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.calls.lock().unwrap().push(req.method.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.behavior {
            Behavior::AlwaysStatus(status) => Err(TransportError::Status {
                status,
                body: format!("{} says no", self.url),
            }),
            Behavior::Healthy => Ok(JsonRpcResponse::success(req.id.clone(), self.answer(&req))),
        }
    }

    fn url(&self) -> &str {
        &self.url
    }
}

pub fn block_time(n: u64) -> u64 {
    GENESIS_TIME + n * BLOCK_TIME
}

pub fn block_hash(n: u64) -> String {
    format!("0x{n:064x}")
}

fn topic_for(addr: u64) -> String {
    format!("0x{addr:064x}")
}

/// A `Transfer` log of `value` base units at block `n`.
pub fn transfer_log(n: u64, log_index: u64, value: u128) -> Value {
    json!({
        "address": TOKEN,
        "topics": [TRANSFER_TOPIC, topic_for(0xaa), topic_for(0xbb)],
        "data": format!("0x{value:064x}"),
        "blockNumber": format!("{n:#x}"),
        "blockHash": block_hash(n),
        "transactionHash": format!("0x{:060x}{log_index:04x}", n),
        "logIndex": format!("{log_index:#x}"),
        "removed": false,
    })
}

pub fn pool_of(ledgers: &[Arc<MockLedger>]) -> EndpointPool {
    let endpoints = ledgers
        .iter()
        .map(|l| Endpoint::new(l.clone() as Arc<dyn RpcTransport>))
        .collect();
    EndpointPool::new(endpoints, EndpointPoolConfig::default()).unwrap()
}

pub fn by_method(calls: &[String]) -> HashMap<&str, usize> {
    let mut map = HashMap::new();
    for c in calls {
        *map.entry(c.as_str()).or_default() += 1;
    }
    map
}
