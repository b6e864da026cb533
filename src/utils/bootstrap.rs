//! Bootstrap utilities for gateway consumers.
//!
//! Shared initialization for binaries and Lambda handlers embedding the gateway.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the DYNAMO_GATEWAY_LOG environment variable.
///
/// Defaults to "info" level if DYNAMO_GATEWAY_LOG is not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
