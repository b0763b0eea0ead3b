use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::dx::DxCallback;
use crate::messenger::ReplySender;
use crate::session::SessionStore;

use super::bounded;

/// What happened to one DX callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Reply handed to the platform for this user.
    Delivered { user_id: String },
    /// No live session for the chat id; reply dropped.
    NoSession,
    /// Session found but the send failed or timed out.
    DeliveryFailed { user_id: String },
}

/// Routes DX results back to the user who started the conversation.
#[derive(Clone)]
pub struct CallbackResolver {
    sessions: SessionStore,
    sender: Arc<dyn ReplySender>,
    timeout: Duration,
}

impl std::fmt::Debug for CallbackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackResolver")
            .field("sessions", &self.sessions.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CallbackResolver {
    #[must_use]
    pub fn new(sessions: SessionStore, sender: Arc<dyn ReplySender>, timeout: Duration) -> Self {
        Self {
            sessions,
            sender,
            timeout,
        }
    }

    /// Deliver `callback.ai_response` to the session's user.
    ///
    /// The session is only read: a callback never extends its lifetime.
    pub async fn resolve(&self, callback: &DxCallback) -> Resolution {
        let Some(session) = self.sessions.get(&callback.chat_id) else {
            warn!(
                name: "relay.callback.orphaned",
                chat_id = %callback.chat_id,
                "No active session for callback; dropping reply"
            );
            return Resolution::NoSession;
        };

        let user_id = session.user_id;
        match bounded(
            self.timeout,
            self.sender.send(&user_id, &callback.ai_response),
        )
        .await
        {
            Ok(()) => {
                info!(
                    name: "relay.reply.sent",
                    chat_id = %callback.chat_id,
                    recipient = %user_id,
                    "Reply delivered"
                );
                Resolution::Delivered { user_id }
            }
            Err(e) => {
                error!(
                    name: "relay.send.failed",
                    chat_id = %callback.chat_id,
                    recipient = %user_id,
                    status = ?e.status(),
                    error = %e,
                    "Failed to send reply"
                );
                Resolution::DeliveryFailed { user_id }
            }
        }
    }
}
