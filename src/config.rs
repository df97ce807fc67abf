//! Command-line configuration.

use std::time::Duration;

use clap::Parser;

use crate::dispatch::BackendEndpoint;
use crate::error::{ProxyError, Result};
use crate::proxy::{UpstreamConfig, DEFAULT_MAX_BODY_BYTES};

/// Session-aware reverse proxy for a pool of WebDriver servers.
#[derive(Debug, Clone, Parser)]
#[command(name = "session-proxy", version, about)]
pub struct ProxyConfig {
    /// Hostname or interface to bind the proxy to.
    #[arg(short = 'H', long, default_value = "localhost")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 7777)]
    pub port: u16,

    /// Backend server as HOST:PORT. Repeat for each backend; order is the
    /// round-robin order.
    #[arg(
        short,
        long = "backend",
        value_name = "HOST:PORT",
        default_values = ["localhost:4723", "localhost:4823", "localhost:4923"]
    )]
    pub backends: Vec<String>,

    /// Port for the /healthz and /readyz listener. Disabled when unset.
    #[arg(long)]
    pub health_port: Option<u16>,

    /// Timeout for connecting to a backend, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub connect_timeout_ms: u64,

    /// Timeout for a whole backend exchange, in milliseconds.
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    /// Largest request body accepted, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

impl ProxyConfig {
    /// Parses the backend list. Fails on an empty list or a bad address.
    pub fn backends(&self) -> Result<Vec<BackendEndpoint>> {
        if self.backends.is_empty() {
            return Err(ProxyError::Config("no backends configured".to_string()));
        }
        self.backends.iter().map(|b| b.parse()).collect()
    }

    /// Timeouts for the outbound client.
    pub fn upstream(&self) -> UpstreamConfig {
        UpstreamConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
        }
    }
}
