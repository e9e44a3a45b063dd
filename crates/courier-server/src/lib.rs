//! # Courier Server
//!
//! HTTP/WebSocket front end for the Courier direct messaging hub: JWT
//! handshake, per-connection socket loop, configuration and metrics.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod metrics;

pub use auth::{Claims, JwtValidator};
pub use config::Config;
pub use handlers::{router, run_server, serve, AppState};
