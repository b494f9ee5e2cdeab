//! # rrsocks - Round-Robin SOCKS5 Relay
//!
//! rrsocks sits in front of groups of loopback SOCKS5 backends run by a proxy
//! engine. Groups are discovered from the engine's JSON document by tag; each
//! group gets a listener that accepts SOCKS5 CONNECT requests and forwards
//! them to the group's backends in strict rotation.
//!
//! ## Features
//!
//! - **Tag-Driven Discovery**: `sys-rr-<group>-lb` outbounds name the listen port,
//!   `sys-rr-<group>-in-<idx>` inbounds name the backends
//! - **Round-Robin Selection**: one shared cursor per group, advanced on every attempt
//! - **Reply Passthrough**: backend refusals reach the client with their original code
//! - **Generations**: restarting from a document replaces every listener at once
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rrsocks::config::RelayConfig;
//! use rrsocks::supervisor::Supervisor;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let supervisor = Supervisor::new(RelayConfig::default())?;
//!     let groups = supervisor.start_from_config("/etc/sing-box/config.json").await?;
//!     println!("{} group(s) running", groups.len());
//!
//!     tokio::signal::ctrl_c().await?;
//!     supervisor.stop_all().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> rrsocks (group listener) -> backend[k mod n] -> Target
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod group;
pub mod socks;
pub mod supervisor;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config, RelayConfig};
pub use error::{RelayError, Socks5Error};
pub use group::Group;
pub use supervisor::Supervisor;

/// Version of the rrsocks library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "rrsocks");
    }
}
