//! Shared types for the scan pipeline.

use alloy_primitives::U256;
use serde::{Serialize, Serializer};

// ─── BlockRange ───────────────────────────────────────────────────────────────

/// An inclusive range of block heights. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRange {
    start: u64,
    end: u64,
}

impl BlockRange {
    /// Build a range from two heights in either order.
    pub fn new(a: u64, b: u64) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of blocks in the range (never zero).
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always `false`; a range holds at least one block.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Smallest range covering both `self` and `other`.
    pub fn union(&self, other: &BlockRange) -> BlockRange {
        BlockRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

// ─── LogRecord ────────────────────────────────────────────────────────────────

/// One decoded token-transfer log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub block_number: u64,
    pub block_hash: String,
    pub tx_hash: String,
    pub log_index: u64,
    /// Checksummed sender address.
    pub from: String,
    /// Checksummed recipient address.
    pub to: String,
    /// Raw token amount, before decimal adjustment.
    pub value: U256,
}

// ─── Row ──────────────────────────────────────────────────────────────────────

/// The caller-facing shape of one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// Block timestamp in epoch milliseconds.
    pub timestamp: i64,
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    /// Decimal-adjusted amount, e.g. `"1250.5"`.
    pub amount: String,
    #[serde(serialize_with = "as_decimal_string")]
    pub block_number: u64,
    pub log_index: u64,
}

impl Row {
    /// Shape a record with its resolved timestamp.
    pub fn from_record(record: &LogRecord, timestamp_ms: i64, decimals: u8) -> Self {
        Self {
            timestamp: timestamp_ms,
            tx_hash: record.tx_hash.clone(),
            from: record.from.clone(),
            to: record.to.clone(),
            amount: format_units(record.value, decimals),
            block_number: record.block_number,
            log_index: record.log_index,
        }
    }
}

/// Render `value / 10^decimals` exactly, trimming trailing fractional zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{frac}")
    }
}

// ─── ScanResult ───────────────────────────────────────────────────────────────

/// Diagnostics describing what a scan call actually did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanInfo {
    pub partial: bool,
    /// Lowest block of the requested window.
    #[serde(serialize_with = "as_decimal_string")]
    pub from_block: u64,
    /// Highest block of the requested window.
    #[serde(serialize_with = "as_decimal_string")]
    pub to_block: u64,
    /// Lowest block actually scanned, if any chunk completed.
    #[serde(serialize_with = "as_optional_decimal_string")]
    pub scanned_from: Option<u64>,
    pub chunks: u32,
    pub records: usize,
    pub timestamps_resolved: usize,
    pub timestamps_defaulted: usize,
    pub endpoints: usize,
    pub elapsed_ms: u64,
}

/// The sole externally visible output of a scan call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Newest first, at most `target` entries.
    pub rows: Vec<Row>,
    pub scanned_blocks: u64,
    /// Block height to pass back as `cursorTo`; `None` once genesis is reached.
    #[serde(rename = "nextCursorTo", serialize_with = "as_optional_decimal_string")]
    pub next_cursor: Option<u64>,
    pub info: ScanInfo,
}

impl ScanResult {
    pub fn partial(&self) -> bool {
        self.info.partial
    }
}

// Block heights cross the JSON boundary as strings: u64 exceeds 2^53.
fn as_decimal_string<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&v.to_string())
}

fn as_optional_decimal_string<S: Serializer>(v: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => s.serialize_str(&v.to_string()),
        None => s.serialize_none(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
