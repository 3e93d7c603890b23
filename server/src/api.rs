//! HTTP API for serving token-transfer scans
//!
//! Endpoints:
//! - GET /api/scan?window=2400&chunk=500&cursorTo=19000000
//! - GET /health

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use chainscan_core::{
    parse_cursor, EndpointPoolConfig, LogFilter, ScanError, ScanRequest, ScanResult, Scanner,
};
use chainscan_http::{http_pool, HttpClientConfig};

use crate::config::{limits, ServerConfig};

/// Immutable state shared by every request.
///
/// Each scan builds its own endpoint pool from `endpoints`; nothing mutable
/// is shared between requests.
#[derive(Debug, Clone)]
pub struct AppState {
    pub endpoints: Vec<String>,
    pub http: HttpClientConfig,
    pub pool: EndpointPoolConfig,
    pub scanner: Scanner,
    pub defaults: ScanRequest,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            endpoints: config.endpoint_urls(),
            http: config.http_client_config(),
            pool: config.pool_config(),
            scanner: Scanner::new(
                LogFilter::transfers(config.token_address.trim()),
                config.token_decimals,
                config.classifier(),
            ),
            defaults: config.scan_defaults(),
        }
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/scan", get(scan))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    "OK"
}

/// Query parameters for the scan endpoint. Delays are in milliseconds.
#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    pub window: Option<u64>,
    pub target: Option<u64>,
    pub chunk: Option<u64>,
    pub cdelay: Option<u64>,
    pub bdelay: Option<u64>,
    pub retries: Option<u64>,
    pub rdelay: Option<u64>,
    pub ratedelay: Option<u64>,
    pub maxms: Option<u64>,
    #[serde(rename = "cursorTo")]
    pub cursor_to: Option<String>,
}

impl ScanQuery {
    /// Overlay the query on `defaults`, clamping every value to its bounds.
    pub fn to_request(&self, defaults: &ScanRequest) -> Result<ScanRequest, ScanError> {
        use limits::clamp;
        let ms = |v: Option<u64>, default: Duration, bounds: &RangeInclusive<u64>| match v {
            Some(v) => Duration::from_millis(clamp(v, bounds)),
            None => default,
        };

        let mut req = defaults.clone();
        if let Some(window) = self.window {
            req.window = clamp(window, &limits::WINDOW);
        }
        if let Some(target) = self.target {
            req.target = clamp(target, &limits::TARGET) as usize;
        }
        if let Some(chunk) = self.chunk {
            req.chunk_size = clamp(chunk, &limits::CHUNK);
        }
        if let Some(retries) = self.retries {
            req.retry.max_retries = clamp(retries, &limits::RETRIES) as u32;
        }
        req.chunk_delay = ms(self.cdelay, defaults.chunk_delay, &limits::DELAY_MS);
        req.block_delay = ms(self.bdelay, defaults.block_delay, &limits::DELAY_MS);
        req.retry.generic_delay = ms(self.rdelay, defaults.retry.generic_delay, &limits::DELAY_MS);
        req.retry.rate_limit_delay =
            ms(self.ratedelay, defaults.retry.rate_limit_delay, &limits::DELAY_MS);
        req.max_duration = ms(self.maxms, defaults.max_duration, &limits::MAX_MS);
        req.cursor = parse_cursor(self.cursor_to.as_deref())?;
        Ok(req)
    }
}

/// Run one scan call.
async fn scan(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ScanQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected scan query");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let span = tracing::info_span!(
        "scan",
        window = ?query.window,
        chunk = ?query.chunk,
        cursor = ?query.cursor_to,
    );
    match run_scan(&state, &query).instrument(span).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) if e.is_config() => {
            tracing::warn!(error = %e, "scan rejected");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "scan failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn run_scan(state: &AppState, query: &ScanQuery) -> Result<ScanResult, ScanError> {
    let req = query.to_request(&state.defaults)?;
    let pool = http_pool(state.endpoints.as_slice(), &state.http, state.pool.clone())?;
    state.scanner.scan(&pool, &req).await
}
