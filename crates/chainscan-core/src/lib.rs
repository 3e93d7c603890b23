//! chainscan-core: chunked log scanning over unreliable JSON-RPC providers.
//!
//! # Overview
//!
//! The core crate turns a handful of rate-limited, range-limited RPC
//! endpoints into a paginated, time-ordered list of token transfers:
//!
//! ```text
//! Scanner ──▶ RangeChunker ──▶ EndpointPool (failover) ──▶ RetryPolicy ──▶ Endpoint
//! ```
//!
//! - [`RpcTransport`]: the async trait every backend connection implements
//! - [`Endpoint`]: typed ledger queries (tip height, logs, block timestamp)
//! - [`EndpointPool`]: ordered failover across endpoints
//! - [`policy`]: classified retry/backoff
//! - [`RangeChunker`]: fixed-size sub-range walk bounded by a deadline
//! - [`Scanner`]: the scan entry point producing a [`ScanResult`]

pub mod chunker;
pub mod endpoint;
pub mod error;
pub mod log;
pub mod policy;
pub mod pool;
pub mod request;
pub mod scan;
pub mod transport;
pub mod types;

pub use chunker::{ChunkOutcome, RangeChunker, ScanOrder};
pub use endpoint::Endpoint;
pub use error::{ScanError, TransportError};
pub use log::{LogFilter, RawLog, TRANSFER_TOPIC};
pub use policy::{ClassifierConfig, ErrorClass, ErrorClassifier, RetryConfig, RetryPolicy};
pub use pool::{parse_endpoint_urls, EndpointPool, EndpointPoolConfig};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use scan::{parse_cursor, ScanRequest, Scanner};
pub use transport::RpcTransport;
pub use types::{BlockRange, LogRecord, Row, ScanInfo, ScanResult};
