//! Messenger ↔ DX relay server.
//!
//! Entry point: loads configuration and serves the webhook and callback API.

use std::sync::Arc;

use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tracing::info;

use messenger_dx_relay::config::AppConfig;
use messenger_dx_relay::{server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    // Load .env (if present) before reading any configuration
    let _ = dotenv();

    telemetry::init();

    let config = match AppConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    info!(
        name: "relay.config.loaded",
        dx_url = %config.dx.submit_url,
        session_timeout_secs = config.session.timeout_secs,
        sweep_interval_secs = config.session.sweep_interval_secs,
        "Relay configuration loaded"
    );
    if config.messenger.page_access_token.is_empty() {
        tracing::warn!("PAGE_ACCESS_TOKEN is not set; replies will be rejected by the Send API");
    }

    if let Err(e) = server::start_server(config).await {
        tracing::error!(error = ?e, "Server error");
        std::process::exit(1);
    }
}
