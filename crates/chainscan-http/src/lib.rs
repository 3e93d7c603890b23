//! chainscan-http: `reqwest`-backed JSON-RPC transport for ChainScan.
//!
//! [`HttpRpcClient`] is a plain single-shot transport: retry, backoff and
//! failover live in `chainscan-core`. [`http_pool`] turns a list of URL
//! strings into a ready [`EndpointPool`](chainscan_core::EndpointPool).

pub mod client;

pub use client::{http_pool, HttpClientConfig, HttpRpcClient};
