//! HTTP client for the DX submit-message endpoint.

use std::time::Duration;

use reqwest::Url;

use crate::error::{OutboundError, OutboundResult};
use crate::http::{build_client, ensure_success};

use super::{DxSubmission, MessageSubmitter};

/// Posts user messages to the DX backend.
#[derive(Clone)]
pub struct DxClient {
    http: reqwest::Client,
    submit_url: Url,
    callback_type: String,
}

impl std::fmt::Debug for DxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DxClient")
            .field("submit_url", &self.submit_url.as_str())
            .field("callback_type", &self.callback_type)
            .finish()
    }
}

impl DxClient {
    /// Create a client for `submit_url` whose requests give up after `timeout`.
    pub fn new(
        submit_url: &str,
        callback_type: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OutboundError> {
        Ok(Self {
            http: build_client(timeout)?,
            submit_url: Url::parse(submit_url)?,
            callback_type: callback_type.into(),
        })
    }

    fn submission(&self, chat_id: &str, text: &str) -> DxSubmission {
        DxSubmission {
            chat_id: chat_id.to_string(),
            user_message: text.to_string(),
            file_ids: Vec::new(),
            file_urls: Vec::new(),
            callback_type: self.callback_type.clone(),
        }
    }
}

#[async_trait::async_trait]
impl MessageSubmitter for DxClient {
    async fn submit(&self, chat_id: &str, text: &str) -> OutboundResult<()> {
        let body = self.submission(chat_id, text);

        let resp = self
            .http
            .post(self.submit_url.clone())
            .json(&body)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;

        tracing::debug!(
            chat_id = %chat_id,
            status = resp.status().as_u16(),
            "Message submitted to DX"
        );
        Ok(())
    }
}
