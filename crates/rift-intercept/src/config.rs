//! Session configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InterceptError, Result};

/// Environment variable overriding [`InterceptConfig::server_header`].
pub const SERVER_HEADER_ENV: &str = "RIFT_INTERCEPT_SERVER_HEADER";

pub const DEFAULT_SERVER_HEADER: &str = "Rift/Intercept";
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const DEFAULT_HTTP_VERSION: &str = "HTTP/1.1";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct InterceptConfig {
    /// Value of the synthesized `Server` header
    pub server_header: String,
    /// `Content-Type` synthesized when a response does not set one
    pub default_content_type: String,
    /// Whether outbound requests are appended to the capture log
    pub record_requests: bool,
    /// Protocol version written in the status line of HTTP responses
    pub http_version: String,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            server_header: DEFAULT_SERVER_HEADER.to_string(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            record_requests: true,
            http_version: DEFAULT_HTTP_VERSION.to_string(),
        }
    }
}

impl InterceptConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: InterceptConfig =
            serde_yaml::from_str(yaml).map_err(|e| InterceptError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(server) = std::env::var(SERVER_HEADER_ENV) {
            if !server.trim().is_empty() {
                config.server_header = server;
            }
        }
        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server_header.trim().is_empty() {
            return Err(InterceptError::Config(
                "server_header must not be empty".to_string(),
            ));
        }
        if self.default_content_type.trim().is_empty() {
            return Err(InterceptError::Config(
                "default_content_type must not be empty".to_string(),
            ));
        }
        if !self.http_version.starts_with("HTTP/") {
            return Err(InterceptError::Config(format!(
                "http_version must look like 'HTTP/1.1', got '{}'",
                self.http_version
            )));
        }
        Ok(())
    }
}
