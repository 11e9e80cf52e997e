//! Server configuration types.
//!
//! This module defines the server-level configuration:
//! - Address and port bindings
//! - Upload size limit
//! - Per-request processing timeout
//! - Optional static frontend directory
//! - HTTP status used for failed requests
//!
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ADDRESS, DEFAULT_MAX_BODY_SIZE_MB, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS,
};

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_body_size_mb() -> usize {
    DEFAULT_MAX_BODY_SIZE_MB
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// HTTP status of failure envelopes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailureStatus {
    /// Status derived from the error kind (400, 413, 415, 500, 504)
    #[default]
    Http,
    /// Always 200; clients read `success: false` from the body
    Ok,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum upload size in MB (default: 50)
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,
    /// Seconds a single watermark job may run (default: 60)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Directory with the web frontend, served at `/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
    /// Status used for failed API requests (default: http)
    #[serde(default)]
    pub failure_status: FailureStatus,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            max_body_size_mb: default_max_body_size_mb(),
            request_timeout_secs: default_request_timeout(),
            static_dir: None,
            failure_status: FailureStatus::default(),
        }
    }
}

impl ServerConfig {
    /// `address:port` for binding the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn max_body_size_bytes(&self) -> usize {
        self.max_body_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
