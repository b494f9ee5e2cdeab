//! Per-group listener
//!
//! A [`ServerHandle`] owns one bound listener and the task accepting on it.
//! Every accepted connection gets its own session task.

use super::stats::GroupStats;
use crate::config::SessionPolicy;
use crate::error::{RelayError, Result};
use crate::group::Group;
use crate::socks::{handle_connection, SessionContext};
use crate::transport::bind_listener;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept, so fd exhaustion does not spin the loop
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Runtime state of one active group
#[derive(Debug)]
pub struct ServerHandle {
    group: Group,
    local_addr: SocketAddr,
    stats: Arc<GroupStats>,
    shutdown_tx: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Bind the group's listener on `listen_addr` and start accepting
    pub fn bind(
        group: Group,
        listen_addr: SocketAddr,
        ctx: SessionContext,
        policy: SessionPolicy,
    ) -> Result<Self> {
        let listener = bind_listener(listen_addr).map_err(|source| RelayError::Bind {
            group: group.id.clone(),
            port: listen_addr.port(),
            source,
        })?;
        let local_addr = listener.local_addr()?;

        let stats = Arc::new(GroupStats::new());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(accept_loop(
            listener,
            Arc::new(ctx),
            stats.clone(),
            policy,
            shutdown_tx.clone(),
            shutdown_rx,
        ));

        info!(
            "Group '{}' listening on {} -> backends {:?}",
            group.id, local_addr, group.backend_ports
        );

        Ok(ServerHandle {
            group,
            local_addr,
            stats,
            shutdown_tx,
            task: Some(task),
        })
    }

    /// The group served by this listener
    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Counters of this listener
    pub fn stats(&self) -> &Arc<GroupStats> {
        &self.stats
    }

    /// Stop accepting and close the listening socket
    ///
    /// Returns once the listener is closed. Failures are logged, never raised.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(());

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Listener task of group '{}' failed: {}", self.group.id, e);
            }
        }

        info!("Group '{}' stopped listening on {}", self.group.id, self.local_addr);
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    ctx: Arc<SessionContext>,
    stats: Arc<GroupStats>,
    policy: SessionPolicy,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("[{}] Shutdown signal received", ctx.group);
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!("[{}] Accepted connection from {}", ctx.group, peer);
                        if let Err(e) = ctx.socket_opts.apply(&stream) {
                            warn!("[{}] Failed to apply socket options: {}", ctx.group, e);
                        }
                        stats.record_accepted();

                        let abort_rx = match policy {
                            SessionPolicy::Abort => Some(shutdown_tx.subscribe()),
                            SessionPolicy::Drain => None,
                        };
                        tokio::spawn(run_session(stream, peer, ctx.clone(), stats.clone(), abort_rx));
                    }
                    Err(e) => {
                        error!("[{}] Accept failed: {}", ctx.group, e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }
}

async fn run_session(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<SessionContext>,
    stats: Arc<GroupStats>,
    abort_rx: Option<broadcast::Receiver<()>>,
) {
    let session = handle_connection(stream, peer, &ctx);

    match abort_rx {
        None => stats.record_finished(session.await),
        Some(mut abort_rx) => {
            tokio::select! {
                end = session => stats.record_finished(end),
                // A closed channel means the listener is gone as well.
                _ = abort_rx.recv() => {
                    debug!("[{}] Session {} aborted by shutdown", ctx.group, peer);
                    stats.record_aborted();
                }
            }
        }
    }
}
