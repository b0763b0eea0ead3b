//! Messaging platform integration (Messenger Platform webhooks and Send API).
//!
//! - [`webhook`]: verification handshake and inbound event payloads
//! - [`ReplySender`]: capability to deliver a reply to a user
//! - [`SendApiClient`]: HTTP implementation of [`ReplySender`]

mod client;
pub mod webhook;

use crate::error::OutboundResult;

pub use client::{MAX_TEXT_CHARS, SendApiClient};
pub use webhook::{InboundMessage, VerifyParams, WebhookPayload};

/// Capability: deliver a text reply to a platform user.
#[async_trait::async_trait]
pub trait ReplySender: Send + Sync {
    /// Send `text` to the user identified by `recipient_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the platform rejects it.
    async fn send(&self, recipient_id: &str, text: &str) -> OutboundResult<()>;
}
