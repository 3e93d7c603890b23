//! Deadline-bounded chunked log fetching.
//!
//! A block range is cut into sub-ranges of at most `chunk_size` blocks and
//! fetched one chunk at a time through the failover pool, sleeping
//! `chunk_delay` between chunks (cut short at the deadline) to stay under
//! provider rate limits. The deadline is checked before each chunk is
//! started; an in-flight request is never interrupted. When the deadline passes first the walk stops and the
//! unprocessed remainder is reported so the caller can resume from it.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::TransportError;
use crate::log::LogFilter;
use crate::policy::RetryPolicy;
use crate::pool::EndpointPool;
use crate::types::{BlockRange, LogRecord};

/// Direction of the chunk walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOrder {
    /// Lowest chunk first.
    #[default]
    Ascending,
    /// Highest chunk first; a truncated walk leaves only older blocks behind.
    Descending,
}

/// Iterator over the sub-ranges of a [`BlockRange`].
#[derive(Debug, Clone)]
pub struct Chunks {
    range: BlockRange,
    size: u64,
    order: ScanOrder,
    next: Option<u64>,
}

impl Iterator for Chunks {
    type Item = BlockRange;

    fn next(&mut self) -> Option<BlockRange> {
        let cursor = self.next?;
        let step = self.size - 1;
        match self.order {
            ScanOrder::Ascending => {
                let hi = cursor.saturating_add(step).min(self.range.end());
                self.next = (hi < self.range.end()).then(|| hi + 1);
                Some(BlockRange::new(cursor, hi))
            }
            ScanOrder::Descending => {
                let lo = cursor.saturating_sub(step).max(self.range.start());
                self.next = (lo > self.range.start()).then(|| lo - 1);
                Some(BlockRange::new(lo, cursor))
            }
        }
    }
}

/// Partition `range` into chunks of at most `size` blocks (`size` 0 is treated as 1).
pub fn chunk_ranges(range: BlockRange, size: u64, order: ScanOrder) -> Chunks {
    let next = match order {
        ScanOrder::Ascending => range.start(),
        ScanOrder::Descending => range.end(),
    };
    Chunks {
        range,
        size: size.max(1),
        order,
        next: Some(next),
    }
}

/// Sleep for `delay`, waking no later than `deadline`.
pub(crate) async fn pace(delay: Duration, deadline: Instant) {
    if delay.is_zero() {
        return;
    }
    let wake = Instant::now()
        .checked_add(delay)
        .map_or(deadline, |t| t.min(deadline));
    tokio::time::sleep_until(wake).await;
}

/// What a chunked fetch produced.
#[derive(Debug, Clone, Default)]
pub struct ChunkOutcome {
    /// Records from every completed chunk, in walk order.
    pub records: Vec<LogRecord>,
    /// Blocks covered by completed chunks (contiguous).
    pub scanned: Option<BlockRange>,
    /// Blocks left unprocessed because the deadline passed.
    pub remaining: Option<BlockRange>,
    /// Number of completed chunks.
    pub chunks: u32,
    pub order: ScanOrder,
}

impl ChunkOutcome {
    /// `true` when the deadline cut the walk short.
    pub fn stopped_early(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn scanned_blocks(&self) -> u64 {
        self.scanned.map(|r| r.len()).unwrap_or(0)
    }

    /// The block the walk would have started its next chunk from.
    pub fn residual_cursor(&self) -> Option<u64> {
        let remaining = self.remaining?;
        Some(match self.order {
            ScanOrder::Ascending => remaining.start(),
            ScanOrder::Descending => remaining.end(),
        })
    }
}

/// Walks a block range chunk by chunk.
#[derive(Debug, Clone)]
pub struct RangeChunker {
    pub chunk_size: u64,
    pub chunk_delay: Duration,
    pub order: ScanOrder,
}

impl RangeChunker {
    pub fn new(chunk_size: u64, chunk_delay: Duration, order: ScanOrder) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_delay,
            order,
        }
    }

    /// Fetch logs for `range`, stopping before any chunk that would start
    /// after `deadline`.
    ///
    /// Fails only when every endpoint in `pool` is exhausted for some chunk.
    pub async fn scan(
        &self,
        pool: &EndpointPool,
        policy: &RetryPolicy,
        filter: &LogFilter,
        range: BlockRange,
        deadline: Instant,
    ) -> Result<ChunkOutcome, TransportError> {
        let mut outcome = ChunkOutcome {
            order: self.order,
            ..Default::default()
        };
        let mut chunks = chunk_ranges(range, self.chunk_size, self.order).peekable();

        while let Some(chunk) = chunks.next() {
            if Instant::now() >= deadline {
                let remaining = match self.order {
                    ScanOrder::Ascending => BlockRange::new(chunk.start(), range.end()),
                    ScanOrder::Descending => BlockRange::new(range.start(), chunk.end()),
                };
                tracing::info!(
                    range = %range,
                    remaining = %remaining,
                    chunks = outcome.chunks,
                    "scan deadline reached, returning partial result"
                );
                outcome.remaining = Some(remaining);
                break;
            }

            let label = format!("eth_getLogs {chunk}");
            let records = pool
                .with_failover(&label, policy, |endpoint| async move {
                    endpoint.logs(chunk, filter).await
                })
                .await?;

            tracing::debug!(chunk = %chunk, logs = records.len(), "chunk complete");
            outcome.records.extend(records);
            outcome.scanned = Some(match outcome.scanned {
                Some(scanned) => scanned.union(&chunk),
                None => chunk,
            });
            outcome.chunks += 1;

            if chunks.peek().is_some() {
                pace(self.chunk_delay, deadline).await;
            }
        }

        Ok(outcome)
    }
}
