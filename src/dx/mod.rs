//! DX backend integration.
//!
//! The DX backend accepts a user message, computes a reply out-of-band and
//! later posts it back to the relay's callback endpoint keyed by `chat_id`.
//!
//! - [`MessageSubmitter`]: capability to hand a message to the backend
//! - [`DxClient`]: HTTP implementation of [`MessageSubmitter`]
//! - [`DxCallback`]: payload the backend posts back

mod client;

use serde::{Deserialize, Serialize};

use crate::error::OutboundResult;

pub use client::DxClient;

/// Body of a submit-message request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DxSubmission {
    /// Correlation key echoed back in the callback.
    pub chat_id: String,
    /// Text the user sent.
    pub user_message: String,
    pub file_ids: Vec<String>,
    pub file_urls: Vec<String>,
    /// Tells the backend which callback route to use.
    pub callback_type: String,
}

/// Asynchronous result delivered by the DX backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DxCallback {
    pub chat_id: String,
    pub ai_response: String,
}

/// Capability: submit a user message for out-of-band processing.
#[async_trait::async_trait]
pub trait MessageSubmitter: Send + Sync {
    /// Submit `text` under the correlation key `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    async fn submit(&self, chat_id: &str, text: &str) -> OutboundResult<()>;
}
