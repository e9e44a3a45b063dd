//! # Courier Server
//!
//! Realtime direct messaging server.
//!
//! ## Usage
//!
//! ```bash
//! # Run with a config file in the working directory
//! courier
//!
//! # Run with environment variables
//! COURIER_JWT_SECRET=change-me COURIER_PORT=8080 courier
//!
//! # Nested settings use a double underscore
//! COURIER_LIMITS__MAX_CONNECTIONS=5000 courier
//! ```

use anyhow::Result;
use courier_server::{config::Config, handlers, metrics};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "courier=debug,courier_core=debug,courier_server=debug";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;

    tracing::info!("Starting Courier server on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
