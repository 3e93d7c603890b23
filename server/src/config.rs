//! Server configuration: command-line flags with `CHAINSCAN_*` environment
//! fallbacks.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use chainscan_core::{
    ClassifierConfig, EndpointPoolConfig, ErrorClassifier, RetryConfig, ScanRequest,
};
use chainscan_http::HttpClientConfig;

use crate::logging::LogConfig;

/// Scan token transfers from rate-limited JSON-RPC endpoints over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chainscan",
    version,
    about,
    long_about = "
Serves paginated, newest-first token transfers for one ERC-20 contract.
Each request scans a block window backward from the chain tip (or from
`cursorTo`), failing over from the primary to the fallback RPC endpoint.

Endpoint URLs are validated per request, not at startup.
"
)]
pub struct ServerConfig {
    /// Primary JSON-RPC endpoint
    #[arg(long, env = "CHAINSCAN_RPC_URL", default_value = "")]
    pub rpc_url: String,

    /// Fallback JSON-RPC endpoint, tried once the primary is exhausted
    #[arg(long, env = "CHAINSCAN_RPC_FALLBACK_URL")]
    pub rpc_fallback_url: Option<String>,

    /// Token contract whose Transfer events are scanned
    #[arg(long, env = "CHAINSCAN_TOKEN_ADDRESS")]
    pub token_address: String,

    /// Token decimals used to render amounts
    #[arg(long, env = "CHAINSCAN_TOKEN_DECIMALS", default_value_t = 6)]
    pub token_decimals: u8,

    /// Listen address
    #[arg(long, env = "CHAINSCAN_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Log level or filter directive ("info", "info,chainscan_core=debug")
    #[arg(long, env = "CHAINSCAN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit JSON logs
    #[arg(long, env = "CHAINSCAN_LOG_JSON")]
    pub log_json: bool,

    /// Default window size in blocks
    #[arg(long, env = "CHAINSCAN_WINDOW", default_value_t = 2400)]
    pub window: u64,

    /// Default maximum rows per response
    #[arg(long, env = "CHAINSCAN_TARGET", default_value_t = 50)]
    pub target: u64,

    /// Default blocks per eth_getLogs call
    #[arg(long, env = "CHAINSCAN_CHUNK", default_value_t = 500)]
    pub chunk: u64,

    /// Default pause between chunks (ms)
    #[arg(long, env = "CHAINSCAN_CHUNK_DELAY_MS", default_value_t = 150)]
    pub chunk_delay_ms: u64,

    /// Default pause between block timestamp lookups (ms)
    #[arg(long, env = "CHAINSCAN_BLOCK_DELAY_MS", default_value_t = 120)]
    pub block_delay_ms: u64,

    /// Default retries per endpoint
    #[arg(long, env = "CHAINSCAN_RETRIES", default_value_t = 3)]
    pub retries: u64,

    /// Default backoff after a generic error (ms)
    #[arg(long, env = "CHAINSCAN_RETRY_DELAY_MS", default_value_t = 500)]
    pub retry_delay_ms: u64,

    /// Default backoff after a rate-limit error (ms)
    #[arg(long, env = "CHAINSCAN_RATE_LIMIT_DELAY_MS", default_value_t = 2000)]
    pub rate_limit_delay_ms: u64,

    /// Default soft time budget per scan (ms)
    #[arg(long, env = "CHAINSCAN_MAX_MS", default_value_t = 20_000)]
    pub max_ms: u64,

    /// Timeout of a single HTTP request to an endpoint (ms)
    #[arg(long, env = "CHAINSCAN_REQUEST_TIMEOUT_MS", default_value_t = 20_000)]
    pub request_timeout_ms: u64,

    /// Pause before failing over to the next endpoint (ms)
    #[arg(long, env = "CHAINSCAN_SWITCH_PAUSE_MS", default_value_t = 300)]
    pub switch_pause_ms: u64,

    /// HTTP statuses treated as rate limiting (comma separated; default 429)
    #[arg(long, env = "CHAINSCAN_RATE_LIMIT_STATUSES", value_delimiter = ',')]
    pub rate_limit_statuses: Vec<u16>,

    /// JSON-RPC error codes treated as rate limiting (default -32005)
    #[arg(
        long,
        env = "CHAINSCAN_RATE_LIMIT_CODES",
        value_delimiter = ',',
        allow_negative_numbers = true
    )]
    pub rate_limit_codes: Vec<i64>,

    /// Error message substrings treated as rate limiting
    #[arg(long, env = "CHAINSCAN_RATE_LIMIT_NEEDLES", value_delimiter = ',')]
    pub rate_limit_needles: Vec<String>,
}

/// Bounds applied to every scan tunable, whether it comes from
/// configuration or from a query string.
pub mod limits {
    use std::ops::RangeInclusive;

    pub const WINDOW: RangeInclusive<u64> = 1..=200_000;
    pub const TARGET: RangeInclusive<u64> = 1..=1000;
    pub const CHUNK: RangeInclusive<u64> = 1..=10_000;
    pub const RETRIES: RangeInclusive<u64> = 0..=10;
    pub const DELAY_MS: RangeInclusive<u64> = 0..=60_000;
    pub const MAX_MS: RangeInclusive<u64> = 1..=120_000;

    pub fn clamp(value: u64, bounds: &RangeInclusive<u64>) -> u64 {
        value.clamp(*bounds.start(), *bounds.end())
    }
}

impl ServerConfig {
    /// Reject configuration the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        let token = self.token_address.trim();
        let hex = token.strip_prefix("0x").unwrap_or("");
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("token address {token:?} is not a 0x-prefixed 20-byte hex address");
        }
        Ok(())
    }

    /// Candidate endpoint URLs in failover order (unvalidated).
    pub fn endpoint_urls(&self) -> Vec<String> {
        std::iter::once(self.rpc_url.clone())
            .chain(self.rpc_fallback_url.clone())
            .collect()
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms.max(1)),
            ..Default::default()
        }
    }

    pub fn pool_config(&self) -> EndpointPoolConfig {
        EndpointPoolConfig {
            switch_pause: Duration::from_millis(self.switch_pause_ms),
        }
    }

    /// Rate-limit classifier; empty lists fall back to the built-in defaults.
    pub fn classifier(&self) -> ErrorClassifier {
        let defaults = ClassifierConfig::default();
        ErrorClassifier::new(ClassifierConfig {
            rate_limit_statuses: or_default(&self.rate_limit_statuses, defaults.rate_limit_statuses),
            rate_limit_codes: or_default(&self.rate_limit_codes, defaults.rate_limit_codes),
            rate_limit_needles: or_default(&self.rate_limit_needles, defaults.rate_limit_needles),
        })
    }

    /// Scan parameters used when a request leaves a tunable unset.
    pub fn scan_defaults(&self) -> ScanRequest {
        use limits::clamp;
        ScanRequest {
            window: clamp(self.window, &limits::WINDOW),
            target: clamp(self.target, &limits::TARGET) as usize,
            chunk_size: clamp(self.chunk, &limits::CHUNK),
            chunk_delay: Duration::from_millis(clamp(self.chunk_delay_ms, &limits::DELAY_MS)),
            block_delay: Duration::from_millis(clamp(self.block_delay_ms, &limits::DELAY_MS)),
            retry: RetryConfig {
                max_retries: clamp(self.retries, &limits::RETRIES) as u32,
                generic_delay: Duration::from_millis(clamp(self.retry_delay_ms, &limits::DELAY_MS)),
                rate_limit_delay: Duration::from_millis(clamp(
                    self.rate_limit_delay_ms,
                    &limits::DELAY_MS,
                )),
            },
            max_duration: Duration::from_millis(clamp(self.max_ms, &limits::MAX_MS)),
            cursor: None,
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            json: self.log_json,
            ..Default::default()
        }
    }
}

fn or_default<T: Clone>(configured: &[T], default: Vec<T>) -> Vec<T> {
    if configured.is_empty() {
        default
    } else {
        configured.to_vec()
    }
}
