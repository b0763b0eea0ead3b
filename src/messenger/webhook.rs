//! Webhook payloads and the subscription handshake.

use serde::Deserialize;

/// Query string of the subscription verification request.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl VerifyParams {
    /// Return the challenge to echo if the request is a valid subscription for
    /// `expected_token`.
    #[must_use]
    pub fn verify(&self, expected_token: &str) -> Option<&str> {
        let subscribed = self.mode.as_deref() == Some("subscribe");
        let token_ok = self.verify_token.as_deref() == Some(expected_token);
        (subscribed && token_ok).then(|| self.challenge.as_deref().unwrap_or_default())
    }
}

/// Top-level webhook event body.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

/// One messaging event; deliveries, reads and postbacks carry no `message`.
#[derive(Debug, Default, Deserialize)]
pub struct MessagingEvent {
    #[serde(default)]
    pub sender: Option<Participant>,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct Participant {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub text: Option<String>,
}

/// A user message extracted from a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Correlation key; the sender id, stable for the whole conversation.
    pub conversation_id: String,
    /// Recipient of the eventual reply.
    pub user_id: String,
    /// Message text; attachments and stickers arrive without one.
    pub text: Option<String>,
}

impl WebhookPayload {
    /// Whether this payload comes from a Page subscription.
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.object.as_deref() == Some("page")
    }

    /// Flatten the payload into the user messages it carries.
    ///
    /// Non-page payloads yield nothing. Events without a `message` or without
    /// a sender are skipped.
    #[must_use]
    pub fn inbound_messages(&self) -> Vec<InboundMessage> {
        if !self.is_page() {
            return Vec::new();
        }

        self.entry
            .iter()
            .flat_map(|entry| entry.messaging.iter())
            .filter_map(|event| {
                let message = event.message.as_ref()?;
                let Some(sender) = event.sender.as_ref() else {
                    tracing::debug!("Skipping message event without sender");
                    return None;
                };
                Some(InboundMessage {
                    conversation_id: sender.id.clone(),
                    user_id: sender.id.clone(),
                    text: message.text.clone(),
                })
            })
            .collect()
    }
}
