//! The scan orchestrator.
//!
//! One call walks a fixed-size window of blocks backward from either the
//! chain tip or a caller-supplied resume cursor:
//!
//! 1. resolve the end boundary (cursor, or `eth_blockNumber`)
//! 2. `start = end - window + 1`, clamped at genesis
//! 3. fetch logs newest chunk first, stopping at the soft deadline
//! 4. resolve block timestamps until the deadline ("now" for the rest)
//! 5. sort rows newest first and keep the first `target`
//! 6. hand back the cursor the next call should resume from

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::time::Instant;

use crate::chunker::{pace, ChunkOutcome, RangeChunker, ScanOrder};
use crate::error::ScanError;
use crate::log::LogFilter;
use crate::policy::{ErrorClassifier, RetryConfig, RetryPolicy};
use crate::pool::EndpointPool;
use crate::types::{BlockRange, LogRecord, Row, ScanInfo, ScanResult};

/// Per-call scan parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Number of blocks to cover, counted back from the end boundary.
    pub window: u64,
    /// Maximum number of rows returned.
    pub target: usize,
    /// Blocks per `eth_getLogs` call.
    pub chunk_size: u64,
    /// Pause between chunk fetches.
    pub chunk_delay: Duration,
    /// Pause between block timestamp lookups.
    pub block_delay: Duration,
    pub retry: RetryConfig,
    /// Soft time budget, measured from the start of the call.
    pub max_duration: Duration,
    /// Resume point: the highest block to scan. `None` starts at the tip.
    pub cursor: Option<u64>,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            window: 2400,
            target: 50,
            chunk_size: 500,
            chunk_delay: Duration::from_millis(150),
            block_delay: Duration::from_millis(120),
            retry: RetryConfig::default(),
            max_duration: Duration::from_secs(20),
            cursor: None,
        }
    }
}

/// Parse a caller-supplied resume cursor. Blank means "start at the tip".
pub fn parse_cursor(raw: Option<&str>) -> Result<Option<u64>, ScanError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<u64>()
        .map(Some)
        .map_err(|_| ScanError::InvalidCursor(raw.to_string()))
}

/// Runs scan calls for one token contract.
#[derive(Debug, Clone)]
pub struct Scanner {
    filter: LogFilter,
    decimals: u8,
    classifier: ErrorClassifier,
}

impl Scanner {
    pub fn new(filter: LogFilter, decimals: u8, classifier: ErrorClassifier) -> Self {
        Self {
            filter,
            decimals,
            classifier,
        }
    }

    /// Run one scan call against `pool`.
    ///
    /// Hitting the soft deadline is not an error: the result is marked
    /// partial and carries a cursor to resume from. The call fails only on
    /// configuration errors or when every endpoint is exhausted.
    pub async fn scan(
        &self,
        pool: &EndpointPool,
        req: &ScanRequest,
    ) -> Result<ScanResult, ScanError> {
        let started = Instant::now();
        let deadline = deadline_after(started, req.max_duration);
        let policy = RetryPolicy::new(req.retry.clone(), self.classifier.clone());

        let end = match req.cursor {
            Some(cursor) => cursor,
            None => {
                pool.with_failover("eth_blockNumber", &policy, |endpoint| async move {
                    endpoint.block_number().await
                })
                .await?
            }
        };
        let start = end.saturating_sub(req.window.max(1) - 1);
        let window = BlockRange::new(start, end);
        tracing::info!(window = %window, cursor = ?req.cursor, "scan started");

        let chunker = RangeChunker::new(req.chunk_size, req.chunk_delay, ScanOrder::Descending);
        let outcome = chunker
            .scan(pool, &policy, &self.filter, window, deadline)
            .await?;

        let timestamps = self
            .resolve_timestamps(pool, &policy, &outcome.records, req.block_delay, deadline)
            .await?;

        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut rows: Vec<Row> = outcome
            .records
            .iter()
            .map(|rec| {
                let ts = timestamps
                    .resolved
                    .get(rec.block_hash.as_str())
                    .copied()
                    .unwrap_or(now_ms);
                Row::from_record(rec, ts, self.decimals)
            })
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(req.target);

        let next_cursor = next_cursor(&outcome, start);
        let partial = outcome.stopped_early() || timestamps.cut_short;
        let info = ScanInfo {
            partial,
            from_block: start,
            to_block: end,
            scanned_from: outcome.scanned.map(|r| r.start()),
            chunks: outcome.chunks,
            records: outcome.records.len(),
            timestamps_resolved: timestamps.resolved.len(),
            timestamps_defaulted: timestamps.defaulted,
            endpoints: pool.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            scanned_blocks = outcome.scanned_blocks(),
            records = info.records,
            rows = rows.len(),
            partial,
            next_cursor = ?next_cursor,
            elapsed_ms = info.elapsed_ms,
            "scan complete"
        );

        Ok(ScanResult {
            rows,
            scanned_blocks: outcome.scanned_blocks(),
            next_cursor,
            info,
        })
    }

    /// Look up block timestamps (ms) for the distinct blocks in `records`,
    /// newest block first, until `deadline` passes.
    async fn resolve_timestamps(
        &self,
        pool: &EndpointPool,
        policy: &RetryPolicy,
        records: &[LogRecord],
        block_delay: Duration,
        deadline: Instant,
    ) -> Result<Timestamps, ScanError> {
        let mut seen = HashSet::new();
        let mut blocks: Vec<(u64, &str)> = records
            .iter()
            .filter(|r| seen.insert(r.block_hash.as_str()))
            .map(|r| (r.block_number, r.block_hash.as_str()))
            .collect();
        blocks.sort_by(|a, b| b.0.cmp(&a.0));

        let mut out = Timestamps::default();
        for (i, (number, hash)) in blocks.iter().enumerate() {
            if i > 0 {
                pace(block_delay, deadline).await;
            }
            if Instant::now() >= deadline {
                let unresolved = blocks.len() - i;
                out.defaulted += unresolved;
                out.cut_short = true;
                tracing::info!(
                    unresolved,
                    "deadline reached, defaulting remaining block timestamps to now"
                );
                break;
            }
            let label = format!("eth_getBlockByHash {number}");
            let hash = *hash;
            let seconds = pool
                .with_failover(&label, policy, |endpoint| async move {
                    endpoint.block_timestamp(hash).await
                })
                .await?;
            match seconds {
                Some(s) => {
                    out.resolved.insert(hash.to_string(), (s as i64).saturating_mul(1000));
                }
                None => {
                    tracing::warn!(block = number, hash, "block not found, using current time");
                    out.defaulted += 1;
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Default)]
struct Timestamps {
    /// block hash → epoch ms
    resolved: HashMap<String, i64>,
    defaulted: usize,
    /// The deadline stopped resolution before every block was looked up.
    cut_short: bool,
}

/// `started + budget`, saturating at roughly thirty years out.
fn deadline_after(started: Instant, budget: Duration) -> Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);
    started
        .checked_add(budget)
        .or_else(|| started.checked_add(FAR_FUTURE))
        .unwrap_or(started)
}

/// Where the next call should resume its backward walk.
fn next_cursor(outcome: &ChunkOutcome, start: u64) -> Option<u64> {
    if let Some(residual) = outcome.residual_cursor() {
        return Some(residual);
    }
    start.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cursor_accepts_heights_and_blank() {
        assert_eq!(parse_cursor(None).unwrap(), None);
        assert_eq!(parse_cursor(Some("")).unwrap(), None);
        assert_eq!(parse_cursor(Some(" 18446744073709551615 ")).unwrap(), Some(u64::MAX));
        assert_eq!(parse_cursor(Some("900")).unwrap(), Some(900));
    }

    #[test]
    fn parse_cursor_rejects_garbage() {
        for bad in ["-1", "0x10", "12.5", "abc", "18446744073709551616"] {
            let err = parse_cursor(Some(bad)).unwrap_err();
            assert!(matches!(err, ScanError::InvalidCursor(_)), "{bad}");
        }
    }

    #[test]
    fn unbounded_budget_does_not_overflow() {
        let now = Instant::now();
        assert!(deadline_after(now, Duration::MAX) > now + Duration::from_secs(86_400 * 365));
        assert_eq!(deadline_after(now, Duration::from_secs(3)), now + Duration::from_secs(3));
    }

    #[test]
    fn cursor_after_complete_window() {
        let outcome = ChunkOutcome {
            scanned: Some(BlockRange::new(901, 1000)),
            order: ScanOrder::Descending,
            ..Default::default()
        };
        assert_eq!(next_cursor(&outcome, 901), Some(900));
    }

    #[test]
    fn cursor_exhausted_at_genesis() {
        let outcome = ChunkOutcome {
            scanned: Some(BlockRange::new(0, 50)),
            order: ScanOrder::Descending,
            ..Default::default()
        };
        assert_eq!(next_cursor(&outcome, 0), None);
    }

    #[test]
    fn cursor_after_deadline_resumes_below_scanned() {
        let outcome = ChunkOutcome {
            scanned: Some(BlockRange::new(981, 1000)),
            remaining: Some(BlockRange::new(901, 980)),
            order: ScanOrder::Descending,
            chunks: 2,
            ..Default::default()
        };
        assert_eq!(next_cursor(&outcome, 901), Some(980));
    }
}
