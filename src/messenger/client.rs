//! Send API client.

use std::time::Duration;

use reqwest::Url;
use serde::Serialize;

use crate::error::{OutboundError, OutboundResult};
use crate::http::{build_client, ensure_success};

use super::ReplySender;

/// Longest text the Send API accepts in one message, in characters.
pub const MAX_TEXT_CHARS: usize = 2000;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    recipient: Recipient<'a>,
    message: OutgoingMessage<'a>,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    text: &'a str,
}

/// Delivers replies through the platform's send-message endpoint.
#[derive(Clone)]
pub struct SendApiClient {
    http: reqwest::Client,
    send_url: Url,
    access_token: String,
}

impl std::fmt::Debug for SendApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendApiClient")
            .field("send_url", &self.send_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SendApiClient {
    /// Create a client posting to `send_url` with the page `access_token`.
    pub fn new(
        send_url: &str,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OutboundError> {
        Ok(Self {
            http: build_client(timeout)?,
            send_url: Url::parse(send_url)?,
            access_token: access_token.into(),
        })
    }

    async fn send_one(&self, recipient_id: &str, text: &str) -> OutboundResult<()> {
        let body = SendMessageRequest {
            recipient: Recipient { id: recipient_id },
            message: OutgoingMessage { text },
        };

        let resp = self
            .http
            .post(self.send_url.clone())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReplySender for SendApiClient {
    async fn send(&self, recipient_id: &str, text: &str) -> OutboundResult<()> {
        let parts = split_text(text, MAX_TEXT_CHARS);
        let count = parts.len();
        for (idx, part) in parts.into_iter().enumerate() {
            if let Err(e) = self.send_one(recipient_id, part).await {
                if count > 1 {
                    tracing::warn!(
                        recipient = %recipient_id,
                        failed_part = idx + 1,
                        parts = count,
                        delivered = idx,
                        "Reply only partially delivered"
                    );
                }
                return Err(e);
            }
        }
        tracing::debug!(recipient = %recipient_id, parts = count, "Reply sent");
        Ok(())
    }
}

/// Split `text` into pieces of at most `max_chars` characters, preferring to
/// break after whitespace.
pub(crate) fn split_text(text: &str, max_chars: usize) -> Vec<&str> {
    if text.chars().count() <= max_chars {
        return vec![text];
    }

    let mut parts = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let hard_end = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(idx, _)| idx);
        if hard_end == rest.len() {
            parts.push(rest);
            break;
        }

        let end = rest[..hard_end]
            .rfind(char::is_whitespace)
            .map(|idx| idx + rest[idx..].chars().next().map_or(1, char::len_utf8))
            .filter(|&idx| idx > 0)
            .unwrap_or(hard_end);

        parts.push(&rest[..end]);
        rest = &rest[end..];
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_uses_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer page-token"))
            .and(body_json(json!({
                "recipient": { "id": "U1" },
                "message": { "text": "hello back" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message_id": "m1" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SendApiClient::new(&server.uri(), "page-token", Duration::from_secs(5)).unwrap();
        client.send("U1", "hello back").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_error_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":{"message":"Invalid OAuth access token"}}"#),
            )
            .mount(&server)
            .await;

        let client = SendApiClient::new(&server.uri(), "bad", Duration::from_secs(5)).unwrap();
        let err = client.send("U1", "hello").await.unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("Invalid OAuth access token"));
    }

    #[tokio::test]
    async fn test_long_reply_is_sent_in_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let client = SendApiClient::new(&server.uri(), "t", Duration::from_secs(5)).unwrap();
        let text = "a".repeat(MAX_TEXT_CHARS + 10);
        client.send("U1", &text).await.unwrap();
    }

    #[tokio::test]
    async fn test_long_reply_stops_at_failed_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("send failed"))
            .expect(1)
            .mount(&server)
            .await;

        let client = SendApiClient::new(&server.uri(), "t", Duration::from_secs(5)).unwrap();
        let text = "a".repeat(MAX_TEXT_CHARS * 2 + 10);
        let err = client.send("U1", &text).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        // The third part is never attempted.
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[test]
    fn test_split_text() {
        assert_eq!(split_text("short", 10), vec!["short"]);
        assert_eq!(split_text("hello world again", 12), vec!["hello world ", "again"]);
        assert_eq!(split_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);

        let multibyte = "ééééé";
        let parts = split_text(multibyte, 2);
        assert_eq!(parts, vec!["éé", "éé", "é"]);
    }
}
