//! Shared plumbing for outbound HTTP calls.

use std::time::Duration;

use crate::error::{OutboundError, OutboundResult};

/// Build a client whose requests are bounded by `timeout`.
pub(crate) fn build_client(timeout: Duration) -> OutboundResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()?)
}

/// Turn a non-2xx response into [`OutboundError::Status`], keeping the body.
pub(crate) async fn ensure_success(resp: reqwest::Response) -> OutboundResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    Err(OutboundError::Status {
        status: status.as_u16(),
        body,
    })
}
