//! chainscan-server: HTTP front end for the ChainScan engine.
//!
//! ```text
//! GET /api/scan?window=&target=&chunk=&cdelay=&bdelay=&retries=&rdelay=&ratedelay=&maxms=&cursorTo=
//! GET /health
//! ```

pub mod api;
pub mod config;
pub mod logging;

pub use api::{router, AppState};
pub use config::ServerConfig;
pub use logging::{init_tracing, LogConfig};
