//! Relay configuration types
//!
//! Defines the main configuration structures for the relay.

use super::{TagConvention, TcpConfig};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Smallest accepted relay buffer
pub const MIN_BUFFER_SIZE: usize = 1024;
/// Largest accepted relay buffer
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

fn default_listen_host() -> String {
    "127.0.0.1".to_string()
}

fn default_backend_host() -> String {
    "127.0.0.1".to_string()
}

/// Default handshake timeout in seconds
fn default_handshake_timeout() -> u64 {
    10
}

/// Default relay buffer size
fn default_buffer_size() -> usize {
    64 * 1024
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Relay configuration
    pub relay: RelayConfig,
}

/// What happens to in-flight sessions when their generation is stopped
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionPolicy {
    /// Close listeners only, let established sessions run to completion
    #[default]
    Drain,
    /// Close listeners and tear down every in-flight session
    Abort,
}

/// Relay configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelayConfig {
    /// Engine document scanned for group declarations
    #[serde(default)]
    pub document: Option<PathBuf>,

    /// Host group listeners bind on
    #[serde(default = "default_listen_host")]
    pub listen_host: String,

    /// Host backends are dialled on
    #[serde(default = "default_backend_host")]
    pub backend_host: String,

    /// Per-operation handshake timeout in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout: u64,

    /// Relay read buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Session policy applied on stop
    #[serde(default)]
    pub session_policy: SessionPolicy,

    /// Tagging convention
    #[serde(default)]
    pub tags: TagConvention,

    /// Socket tuning
    #[serde(default)]
    pub socket: TcpConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            document: None,
            listen_host: default_listen_host(),
            backend_host: default_backend_host(),
            handshake_timeout: default_handshake_timeout(),
            buffer_size: default_buffer_size(),
            session_policy: SessionPolicy::default(),
            tags: TagConvention::default(),
            socket: TcpConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Handshake timeout as a duration
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout)
    }

    /// Parsed listen host, loopback only
    pub fn listen_ip(&self) -> Result<IpAddr, String> {
        loopback_ip("listen_host", &self.listen_host)
    }

    /// Parsed backend host, loopback only
    pub fn backend_ip(&self) -> Result<IpAddr, String> {
        loopback_ip("backend_host", &self.backend_host)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.listen_ip()?;
        self.backend_ip()?;
        if self.handshake_timeout == 0 {
            return Err("Handshake timeout must be greater than zero".to_string());
        }
        if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            return Err(format!(
                "Buffer size {} outside {}..={}",
                self.buffer_size, MIN_BUFFER_SIZE, MAX_BUFFER_SIZE
            ));
        }
        self.tags.validate()
    }
}

fn loopback_ip(field: &str, value: &str) -> Result<IpAddr, String> {
    let ip: IpAddr = value
        .parse()
        .map_err(|_| format!("{} is not an IP address: {}", field, value))?;
    if !ip.is_loopback() {
        return Err(format!("{} must be a loopback address: {}", field, value));
    }
    Ok(ip)
}
