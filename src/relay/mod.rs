//! Correlation between inbound chat messages and asynchronous DX replies.
//!
//! # Architecture
//!
//! - [`InboundRouter`]: records the session and submits the message to DX
//! - [`CallbackResolver`]: maps a DX result back to the user and sends it
//!
//! Both share one [`SessionStore`](crate::session::SessionStore) and treat
//! every outbound failure as a log entry, never as an error for the caller.

mod resolver;
mod router;

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{OutboundError, OutboundResult};

pub use resolver::{CallbackResolver, Resolution};
pub use router::{DispatchOutcome, InboundRouter};

/// Await an outbound call, giving up after `timeout`.
async fn bounded<F>(timeout: Duration, call: F) -> OutboundResult<()>
where
    F: Future<Output = OutboundResult<()>>,
{
    bounded_until(Instant::now() + timeout, timeout, call).await
}

/// Await an outbound call, giving up at `deadline`.
///
/// `timeout` is only reported in the resulting error.
async fn bounded_until<F>(deadline: Instant, timeout: Duration, call: F) -> OutboundResult<()>
where
    F: Future<Output = OutboundResult<()>>,
{
    tokio::time::timeout_at(deadline, call)
        .await
        .unwrap_or(Err(OutboundError::Timeout(timeout)))
}
