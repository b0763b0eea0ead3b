use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::dx::MessageSubmitter;
use crate::messenger::{InboundMessage, WebhookPayload};
use crate::session::SessionStore;

use super::bounded_until;

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No text; nothing recorded or submitted.
    Skipped,
    /// Session recorded and the message accepted by DX.
    Submitted,
    /// Session recorded but the submission failed or timed out.
    SubmitFailed,
}

/// Records sessions for inbound messages and forwards them to DX.
#[derive(Clone)]
pub struct InboundRouter {
    sessions: SessionStore,
    submitter: Arc<dyn MessageSubmitter>,
    timeout: Duration,
}

impl std::fmt::Debug for InboundRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundRouter")
            .field("sessions", &self.sessions.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl InboundRouter {
    #[must_use]
    pub fn new(
        sessions: SessionStore,
        submitter: Arc<dyn MessageSubmitter>,
        timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            submitter,
            timeout,
        }
    }

    /// Record the session for `message` and submit its text to DX.
    ///
    /// The session is written before the submission starts, so a callback
    /// racing the submit response still finds it. Empty text counts as no
    /// text.
    pub async fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        self.dispatch_until(message, Instant::now() + self.timeout)
            .await
    }

    async fn dispatch_until(&self, message: &InboundMessage, deadline: Instant) -> DispatchOutcome {
        let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) else {
            debug!(sender = %message.user_id, "Ignoring message without text");
            return DispatchOutcome::Skipped;
        };

        self.sessions
            .put(message.conversation_id.as_str(), message.user_id.as_str());

        info!(
            name: "relay.inbound.received",
            conversation_id = %message.conversation_id,
            text_len = text.len(),
            "Inbound message recorded"
        );

        match bounded_until(
            deadline,
            self.timeout,
            self.submitter.submit(&message.conversation_id, text),
        )
        .await
        {
            Ok(()) => DispatchOutcome::Submitted,
            Err(e) => {
                error!(
                    name: "relay.submit.failed",
                    conversation_id = %message.conversation_id,
                    status = ?e.status(),
                    error = %e,
                    "Failed to submit message to DX"
                );
                DispatchOutcome::SubmitFailed
            }
        }
    }

    /// Dispatch every user message in a webhook payload.
    ///
    /// Messages from one conversation are dispatched one after another in
    /// payload order; separate conversations proceed concurrently. The whole
    /// batch shares a single outbound deadline. Outcomes are returned in
    /// payload order.
    pub async fn handle_payload(&self, payload: &WebhookPayload) -> Vec<DispatchOutcome> {
        if !payload.is_page() {
            debug!(object = ?payload.object, "Ignoring non-page webhook payload");
            return Vec::new();
        }

        let messages = payload.inbound_messages();
        let deadline = Instant::now() + self.timeout;

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut by_conversation: HashMap<&str, usize> = HashMap::new();
        for (idx, message) in messages.iter().enumerate() {
            let group = *by_conversation
                .entry(message.conversation_id.as_str())
                .or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
            groups[group].push(idx);
        }

        let messages = &messages;
        let per_conversation = join_all(groups.iter().map(|group| async move {
            let mut outcomes = Vec::with_capacity(group.len());
            for &idx in group {
                outcomes.push((idx, self.dispatch_until(&messages[idx], deadline).await));
            }
            outcomes
        }))
        .await;

        let mut outcomes = vec![DispatchOutcome::Skipped; messages.len()];
        for (idx, outcome) in per_conversation.into_iter().flatten() {
            outcomes[idx] = outcome;
        }
        outcomes
    }
}
