//! Centralized configuration for the array transport.
//!
//! Constants for routes, content types and timeouts live in
//! [`TransportConfig`]; the per-process server settings live in
//! [`ServerConfig`].

use crate::{Result, TransportError};
use std::net::SocketAddr;
use std::time::Duration;

/// Transport-level constants shared by server and client.
pub struct TransportConfig;

impl TransportConfig {
    pub const ARROW_MIME: &'static str = "application/vnd.apache.arrow.stream";
    pub const COMMANDS_ROUTE: &'static str = "/commands/:token";
    pub const COMMANDS_PATH_SEGMENT: &'static str = "commands";
    pub const HEALTH_ROUTE: &'static str = "/health";

    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 5008;
    pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024; // 64MB

    // Client timeouts
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);
    /// Delay between `/health` attempts while waiting for a server to start
    pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(100);
}

/// Settings for a running transport server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on (0 = auto-assign)
    pub port: u16,
    /// Largest accepted PUT body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: TransportConfig::DEFAULT_HOST.to_string(),
            port: TransportConfig::DEFAULT_PORT,
            max_body_bytes: TransportConfig::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Create a config bound to `host:port` with default limits.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Parse the socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| TransportError::Config {
                message: format!("Invalid bind address {}:{}: {}", self.host, self.port, e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5008);
        assert_eq!(config.max_body_bytes, TransportConfig::DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn test_health_poll_interval_within_timeout() {
        assert!(TransportConfig::HEALTH_POLL_INTERVAL < TransportConfig::HEALTH_TIMEOUT);
        assert!(!TransportConfig::HEALTH_POLL_INTERVAL.is_zero());
    }

    #[test]
    fn test_bind_addr() {
        let addr = ServerConfig::new("127.0.0.1", 0).bind_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 0);
    }

    #[test]
    fn test_bind_addr_rejects_garbage_host() {
        let result = ServerConfig::new("not a host", 80).bind_addr();
        assert!(matches!(result, Err(TransportError::Config { .. })));
    }
}
