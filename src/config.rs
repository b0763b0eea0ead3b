use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

/// Default Graph API endpoint for sending Messenger replies.
pub const DEFAULT_SEND_API_URL: &str = "https://graph.facebook.com/v18.0/me/messages";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Token the platform echoes during webhook verification
    #[arg(long, env = "FB_VERIFY_TOKEN")]
    pub verify_token: Option<String>,

    /// Page access token used to send replies
    #[arg(long, env = "PAGE_ACCESS_TOKEN", hide_env_values = true)]
    pub page_access_token: Option<String>,

    /// DX backend submit-message URL
    #[arg(long, env = "DX_API_URL")]
    pub dx_url: Option<String>,

    /// Seconds a session may stay idle before eviction
    #[arg(long, env = "SESSION_TIMEOUT_SECS")]
    pub session_timeout: Option<u64>,

    /// Seconds between eviction sweeps
    #[arg(long, env = "SWEEP_INTERVAL_SECS")]
    pub sweep_interval: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub messenger: MessengerConfig,
    pub dx: DxConfig,
    pub session: SessionConfig,
    pub outbound: OutboundConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Upper bound on handling one inbound request.
    pub request_timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct MessengerConfig {
    pub verify_token: String,
    pub page_access_token: String,
    pub send_api_url: String,
}

// Tokens stay out of logs.
impl std::fmt::Debug for MessengerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessengerConfig")
            .field("verify_token", &"<redacted>")
            .field("page_access_token", &"<redacted>")
            .field("send_api_url", &self.send_api_url)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DxConfig {
    pub submit_url: String,
    pub callback_type: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutboundConfig {
    pub timeout_secs: u64,
}

impl OutboundConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("messenger.verify_token", "myverifytoken")?
            .set_default("messenger.page_access_token", "")?
            .set_default("messenger.send_api_url", DEFAULT_SEND_API_URL)?
            .set_default("dx.submit_url", "http://localhost:8080/api/v1/messages")?
            .set_default("dx.callback_type", "messenger")?
            .set_default("session.timeout_secs", 300)?
            .set_default("session.sweep_interval_secs", 5)?
            .set_default("outbound.timeout_secs", 5)?;

        // 2. Config file: explicit path must exist, ./config.{yaml,toml,json} is optional
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Environment variables, e.g. RELAY_SESSION__TIMEOUT_SECS=60
        builder = builder.add_source(
            Environment::with_prefix("RELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags and their legacy env names win over everything else
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(token) = cli.verify_token {
            builder = builder.set_override("messenger.verify_token", token)?;
        }
        if let Some(token) = cli.page_access_token {
            builder = builder.set_override("messenger.page_access_token", token)?;
        }
        if let Some(url) = cli.dx_url {
            builder = builder.set_override("dx.submit_url", url)?;
        }
        if let Some(secs) = cli.session_timeout {
            builder = builder.set_override("session.timeout_secs", secs)?;
        }
        if let Some(secs) = cli.sweep_interval {
            builder = builder.set_override("session.sweep_interval_secs", secs)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let positive = [
            ("session.timeout_secs", self.session.timeout_secs),
            ("session.sweep_interval_secs", self.session.sweep_interval_secs),
            ("outbound.timeout_secs", self.outbound.timeout_secs),
            ("server.request_timeout_secs", self.server.request_timeout_secs),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(config::ConfigError::Message(format!(
                    "{key} must be greater than zero"
                )));
            }
        }

        // The webhook waits for DX inline; it must answer before the request
        // timeout cuts it off.
        if self.server.request_timeout_secs <= self.outbound.timeout_secs {
            return Err(config::ConfigError::Message(format!(
                "server.request_timeout_secs ({}) must be greater than outbound.timeout_secs ({})",
                self.server.request_timeout_secs, self.outbound.timeout_secs
            )));
        }

        for (key, value) in [
            ("messenger.send_api_url", &self.messenger.send_api_url),
            ("dx.submit_url", &self.dx.submit_url),
        ] {
            Url::parse(value)
                .map_err(|e| config::ConfigError::Message(format!("{key} is invalid: {e}")))?;
        }

        Ok(())
    }
}
