//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use messenger_dx_relay::config::{
    AppConfig, DxConfig, MessengerConfig, OutboundConfig, ServerConfig, SessionConfig,
};
use messenger_dx_relay::dx::MessageSubmitter;
use messenger_dx_relay::error::OutboundResult;
use messenger_dx_relay::messenger::ReplySender;

pub const VERIFY_TOKEN: &str = "test-verify-token";

/// Config pointing at `dx_url` and `send_url`, with short timeouts.
pub fn test_config(dx_url: &str, send_url: &str) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            request_timeout_secs: 30,
        },
        messenger: MessengerConfig {
            verify_token: VERIFY_TOKEN.to_string(),
            page_access_token: "page-token".to_string(),
            send_api_url: send_url.to_string(),
        },
        dx: DxConfig {
            submit_url: dx_url.to_string(),
            callback_type: "messenger".to_string(),
        },
        session: SessionConfig {
            timeout_secs: 300,
            sweep_interval_secs: 5,
        },
        outbound: OutboundConfig { timeout_secs: 5 },
    }
}

/// Records every submitted `(chat_id, text)` pair.
#[derive(Default)]
pub struct FakeDx {
    pub submitted: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl MessageSubmitter for FakeDx {
    async fn submit(&self, chat_id: &str, text: &str) -> OutboundResult<()> {
        self.submitted
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Records every sent `(recipient, text)` pair.
#[derive(Default)]
pub struct FakeMessenger {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl ReplySender for FakeMessenger {
    async fn send(&self, recipient_id: &str, text: &str) -> OutboundResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), text.to_string()));
        Ok(())
    }
}

pub fn fakes() -> (Arc<FakeDx>, Arc<FakeMessenger>) {
    (Arc::new(FakeDx::default()), Arc::new(FakeMessenger::default()))
}
