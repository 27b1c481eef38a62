//! HTTP server settings

use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Default request body limit (20 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Listener, CORS and request limits for the segmentation server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// TCP port to bind
    pub port: u16,

    /// Allowed CORS origins, `*` allows any origin
    pub cors_origins: Vec<String>,

    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,

    /// Answer every request with `200` and report failures in-band
    pub legacy_status: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            legacy_status: false,
        }
    }
}

impl ServerConfig {
    /// Socket address built from `host` and `port`
    ///
    /// # Errors
    /// - Host is not an IP address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let host = match self.host.trim_start_matches('[').trim_end_matches(']') {
            "localhost" => "127.0.0.1",
            other => other,
        };
        let ip = host.parse().map_err(|_| {
            SegmentationError::config_value_error(
                "server host",
                self.host.as_str(),
                "an IP address",
                Some("127.0.0.1"),
            )
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Whether any origin may call the API
    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|origin| origin == "*")
    }

    /// Validate server settings
    ///
    /// # Errors
    /// - Unparseable host
    /// - Zero body limit
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.max_body_bytes == 0 {
            return Err(SegmentationError::invalid_config(
                "Maximum body size must be greater than zero",
            ));
        }
        Ok(())
    }
}
