//! Configuration module for rrsocks
//!
//! This module provides configuration types and parsing for the relay.

mod relay;
mod socket;
mod tags;

pub use relay::{Config, RelayConfig, SessionPolicy, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
pub use socket::TcpConfig;
pub use tags::{
    TagConvention, DEFAULT_IN_MARK, DEFAULT_KIND, DEFAULT_LOOPBACK, DEFAULT_OUT_SUFFIX,
    DEFAULT_PREFIX,
};

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .relay
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| "Invalid relay configuration")?;
    Ok(config)
}
