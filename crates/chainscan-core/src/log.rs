//! Raw `eth_getLogs` entries and their decoding into transfer records.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{BlockRange, LogRecord};

/// `keccak256("Transfer(address,address,uint256)")`
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "blockHash")]
    pub block_hash: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(default)]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }

    /// Decode an ERC-20 `Transfer` log.
    ///
    /// Returns `None` for removed logs, logs with fewer than three topics and
    /// logs whose numeric fields are not valid hex.
    pub fn decode_transfer(&self) -> Option<LogRecord> {
        if self.is_removed() || self.topics.len() < 3 {
            return None;
        }
        let from = topic_address(&self.topics[1])?;
        let to = topic_address(&self.topics[2])?;

        let data = self.data.strip_prefix("0x").unwrap_or(&self.data);
        // Some tokens emit a zero-length data field for zero-value transfers.
        let value = if data.is_empty() {
            U256::ZERO
        } else {
            U256::from_str_radix(data, 16).ok()?
        };

        Some(LogRecord {
            block_number: parse_hex_u64(&self.block_number)?,
            block_hash: self.block_hash.clone(),
            tx_hash: self.tx_hash.clone(),
            log_index: parse_hex_u64(&self.log_index)?,
            from,
            to,
            value,
        })
    }
}

fn topic_address(topic: &str) -> Option<String> {
    let word: B256 = topic.parse().ok()?;
    Some(Address::from_word(word).to_checksum(None))
}

/// Which logs a scan asks the node for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// Token contract address.
    pub address: String,
    /// Event signature hash, normally [`TRANSFER_TOPIC`].
    pub topic0: String,
}

impl LogFilter {
    /// Filter for `Transfer` events of a single token contract.
    pub fn transfers(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            topic0: TRANSFER_TOPIC.to_string(),
        }
    }

    /// The `eth_getLogs` filter object for `range`.
    pub fn to_params(&self, range: BlockRange) -> Value {
        json!({
            "fromBlock": format!("{:#x}", range.start()),
            "toBlock": format!("{:#x}", range.end()),
            "address": self.address,
            "topics": [self.topic0],
        })
    }
}

/// Parse a hex-encoded quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Option<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return None;
    }
    u64::from_str_radix(s, 16).ok()
}
