use std::path::Path;
use std::time::Duration;

use nctx_gate::GateConfig;
use nctx_protocol::capabilities;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name the server is registered under (`loopback:<name>`).
    pub name: String,
    /// Capabilities announced in the hello reply.
    pub capabilities: Vec<String>,
    /// Artificial latency added before every reply, in milliseconds.
    pub response_delay_ms: u64,
    /// Batches buffered per change-feed receiver.
    pub feed_capacity: usize,
    pub allow_anonymous: bool,
    pub gate: GateConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            capabilities: vec![
                capabilities::BASE_1_0.into(),
                capabilities::BASE_1_1.into(),
                capabilities::CANDIDATE.into(),
                capabilities::VALIDATE.into(),
                capabilities::STARTUP.into(),
                capabilities::ROLLBACK_ON_ERROR.into(),
            ],
            response_delay_ms: 0,
            feed_capacity: 1024,
            allow_anonymous: true,
            gate: GateConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
