//! Messenger ↔ DX relay
//!
//! Bridges a Messenger Platform webhook with the DX backend, which computes
//! replies out-of-band and posts them back later. An in-memory session store
//! correlates each callback with the user who started the conversation, and a
//! background sweeper evicts conversations that have gone idle.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server for the webhook and the DX callback
//! - **Relay**: Inbound router and callback resolver
//! - **Session**: Correlation store and idle eviction
//! - **Outbound**: Send API and DX submit clients behind small traits
//!
//! # Modules
//!
//! - [`config`]: Layered configuration (defaults, file, env, CLI)
//! - [`dx`]: DX backend payloads and submit client
//! - [`messenger`]: Webhook payloads, verification and Send API client
//! - [`relay`]: Inbound routing and callback resolution
//! - [`session`]: Session store and sweeper

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod dx;
pub mod error;
mod http;
pub mod messenger;
pub mod relay;
pub mod server;
pub mod session;
pub mod telemetry;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::dx::{DxClient, MessageSubmitter};
use crate::error::OutboundError;
use crate::messenger::{ReplySender, SendApiClient};
use crate::relay::{CallbackResolver, InboundRouter};
use crate::session::SessionStore;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Session store shared by the router, resolver and sweeper.
    pub sessions: SessionStore,
    /// Handles inbound webhook messages.
    pub router: Arc<InboundRouter>,
    /// Handles DX callbacks.
    pub resolver: Arc<CallbackResolver>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the relay around the given outbound collaborators.
    #[must_use]
    pub fn new(
        config: Arc<AppConfig>,
        submitter: Arc<dyn MessageSubmitter>,
        sender: Arc<dyn ReplySender>,
    ) -> Self {
        let sessions = SessionStore::new();
        let timeout = config.outbound.timeout();

        Self {
            router: Arc::new(InboundRouter::new(sessions.clone(), submitter, timeout)),
            resolver: Arc::new(CallbackResolver::new(sessions.clone(), sender, timeout)),
            sessions,
            config,
        }
    }

    /// Wire the relay with the HTTP clients described by `config`.
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, OutboundError> {
        let timeout = config.outbound.timeout();
        let submitter = Arc::new(DxClient::new(
            &config.dx.submit_url,
            config.dx.callback_type.clone(),
            timeout,
        )?);
        let sender = Arc::new(SendApiClient::new(
            &config.messenger.send_api_url,
            config.messenger.page_access_token.clone(),
            timeout,
        )?);

        Ok(Self::new(config, submitter, sender))
    }
}
