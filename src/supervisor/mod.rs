//! Listener lifecycle
//!
//! The [`Supervisor`] owns the currently active generation of group
//! listeners. Starting from a document replaces the whole generation;
//! stopping closes every listener.

mod server;
mod stats;

pub use server::ServerHandle;
pub use stats::{GroupStats, GroupStatsSnapshot};

use crate::config::{RelayConfig, SessionPolicy};
use crate::error::{RelayError, Result};
use crate::group::{load_groups, BackendSelector, Group};
use crate::socks::SessionContext;
use crate::transport::SocketOpts;
use serde::Serialize;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{error, info};

/// A running group as reported by [`Supervisor::active_groups`]
#[derive(Debug, Clone, Serialize)]
pub struct ActiveGroup {
    /// Group definition
    pub group: Group,
    /// Bound listener address
    pub local_addr: SocketAddr,
    /// Session counters
    pub stats: GroupStatsSnapshot,
}

/// Owner of the active listener generation
#[derive(Debug)]
pub struct Supervisor {
    config: RelayConfig,
    listen_host: IpAddr,
    backend_host: IpAddr,
    socket_opts: SocketOpts,
    active: Mutex<HashMap<String, ServerHandle>>,
}

impl Supervisor {
    /// Create a supervisor with no active groups
    pub fn new(config: RelayConfig) -> Result<Self> {
        config.validate().map_err(RelayError::Config)?;

        let listen_host = config.listen_ip().map_err(RelayError::Config)?;
        let backend_host = config.backend_ip().map_err(RelayError::Config)?;
        let socket_opts = SocketOpts::from_tcp_config(&config.socket);

        Ok(Supervisor {
            config,
            listen_host,
            backend_host,
            socket_opts,
            active: Mutex::new(HashMap::new()),
        })
    }

    /// Relay configuration in use
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Replace the active generation with the groups declared in `path`
    ///
    /// The previous generation is stopped first, even if the document then
    /// fails to load. If any listener fails to bind, the listeners already
    /// started by this call are closed again and the error is returned, so
    /// no group is left running.
    pub async fn start_from_config<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Group>> {
        let path = path.as_ref();
        let mut active = self.active.lock().await;

        retire(&mut active).await;

        let groups = load_groups(path, &self.config.tags)?;
        info!("Found {} group(s) in {:?}", groups.len(), path);

        let mut started: Vec<ServerHandle> = Vec::with_capacity(groups.len());
        for group in &groups {
            match self.spawn_group(group.clone()) {
                Ok(handle) => started.push(handle),
                Err(e) => {
                    error!("{}", e);
                    for handle in started {
                        handle.stop().await;
                    }
                    return Err(e);
                }
            }
        }

        for handle in started {
            active.insert(handle.group().id.clone(), handle);
        }

        info!("{} group(s) active", active.len());
        Ok(groups)
    }

    /// Close every active listener
    ///
    /// Calling this with nothing running is a no-op.
    pub async fn stop_all(&self) {
        let mut active = self.active.lock().await;
        if active.is_empty() {
            return;
        }
        retire(&mut active).await;
        info!("All groups stopped");
    }

    /// Currently running groups, sorted by id
    pub async fn active_groups(&self) -> Vec<ActiveGroup> {
        let active = self.active.lock().await;
        let mut groups: Vec<ActiveGroup> = active
            .values()
            .map(|handle| ActiveGroup {
                group: handle.group().clone(),
                local_addr: handle.local_addr(),
                stats: handle.stats().snapshot(),
            })
            .collect();
        groups.sort_by(|a, b| a.group.id.cmp(&b.group.id));
        groups
    }

    fn spawn_group(&self, group: Group) -> Result<ServerHandle> {
        let ctx = SessionContext {
            group: group.id.clone(),
            selector: BackendSelector::new(group.backend_ports.clone()),
            backend_host: self.backend_host,
            handshake_timeout: self.config.handshake_timeout(),
            buffer_size: self.config.buffer_size,
            socket_opts: self.socket_opts.clone(),
        };
        let listen_addr = SocketAddr::new(self.listen_host, group.listen_port);
        ServerHandle::bind(group, listen_addr, ctx, self.session_policy())
    }

    fn session_policy(&self) -> SessionPolicy {
        self.config.session_policy
    }
}

async fn retire(active: &mut HashMap<String, ServerHandle>) {
    for (_, handle) in active.drain() {
        handle.stop().await;
    }
}
