//! Server configuration
//!
//! Command line flags with environment variable fallbacks.

use std::time::Duration;

use clap::Parser;

use crate::hub::{DEFAULT_QUEUE_CAPACITY, DEFAULT_SEND_TIMEOUT};

/// WebSocket presence and messaging hub
#[derive(Parser, Clone, Debug)]
#[command(name = "chat_hub", version, about = "WebSocket presence and messaging hub")]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "CHAT_HUB_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CHAT_HUB_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Request path accepted for the WebSocket upgrade
    #[arg(long, env = "CHAT_HUB_WS_PATH", default_value = "/ws")]
    pub ws_path: String,

    /// Capacity of the dispatcher's inbound queue
    #[arg(long, env = "CHAT_HUB_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Upper bound on a single outbound send, in milliseconds
    #[arg(long, env = "CHAT_HUB_SEND_TIMEOUT_MS", default_value_t = DEFAULT_SEND_TIMEOUT.as_millis() as u64)]
    pub send_timeout_ms: u64,
}

impl Config {
    /// `host:port` for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ws_path: "/ws".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT.as_millis() as u64,
        }
    }
}
