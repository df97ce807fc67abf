//! Backend endpoint value type.

use std::fmt;
use std::str::FromStr;

use crate::error::ProxyError;

/// A `(host, port)` pair identifying one backend server.
///
/// Immutable; equality and hashing are by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendEndpoint {
    host: String,
    port: u16,
}

impl BackendEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Renders the endpoint as an HTTP authority.
    ///
    /// IPv6 literals are bracketed: `[::1]:4723`.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Builds an absolute `http://` URL for a path (with query) on this endpoint.
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.authority(), path_and_query)
    }
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

impl FromStr for BackendEndpoint {
    type Err = ProxyError;

    /// Parses `host:port` or `[ipv6]:port`. The port is mandatory.
    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ProxyError::InvalidEndpoint {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let address = address.trim();

        let (host, port) = if let Some(rest) = address.strip_prefix('[') {
            // [::1]:4723 -> ("::1", "4723")
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| invalid("missing port"))?;
            (host, port)
        } else {
            address
                .rsplit_once(':')
                .ok_or_else(|| invalid("missing port"))?
        };

        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let port = port
            .parse::<u16>()
            .map_err(|e| invalid(&format!("bad port: {e}")))?;

        Ok(Self::new(host, port))
    }
}
