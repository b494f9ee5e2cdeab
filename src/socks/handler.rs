//! Connection handler
//!
//! Runs one accepted connection through the server handshake, backend
//! selection, the client handshake and finally the relay. Failures are local
//! to the session; the listener and other sessions are never affected.

use super::client::connect_backend;
use super::reply::build_reply;
use super::server::accept_connect;
use super::tcp_relay::relay_tcp;
use super::types::HandshakeOutcome;
use crate::error::Socks5ReplyCode;
use crate::group::BackendSelector;
use crate::transport::SocketOpts;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Everything a session of one group needs
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Group id, for logging
    pub group: String,
    /// Round-robin selector shared by all sessions of the group
    pub selector: BackendSelector,
    /// Host the backends listen on
    pub backend_host: IpAddr,
    /// Per-operation handshake timeout
    pub handshake_timeout: Duration,
    /// Relay buffer size
    pub buffer_size: usize,
    /// Options applied to backend sockets
    pub socket_opts: SocketOpts,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client handshake failed, no backend was contacted
    Rejected,
    /// The backend handshake failed
    BackendFailed,
    /// Bytes were relayed until one side closed
    Relayed,
}

/// Handle one accepted client connection to completion
pub async fn handle_connection(
    mut client: TcpStream,
    peer: SocketAddr,
    ctx: &SessionContext,
) -> SessionEnd {
    let timeout = ctx.handshake_timeout;

    let request = match accept_connect(&mut client, timeout).await {
        HandshakeOutcome::Success(request) => request,
        HandshakeOutcome::ProtocolViolation { error, reply } => {
            debug!("[{}] Rejecting {}: {}", ctx.group, peer, error);
            if let Some(code) = reply {
                let _ = build_reply(&mut client, code.into()).await;
            }
            return SessionEnd::Rejected;
        }
        HandshakeOutcome::Timeout => {
            debug!("[{}] Handshake with {} timed out", ctx.group, peer);
            return SessionEnd::Rejected;
        }
        HandshakeOutcome::BackendUnavailable { .. } => return SessionEnd::Rejected,
    };

    let port = ctx.selector.next_port();
    let backend_addr = SocketAddr::new(ctx.backend_host, port);
    debug!(
        "[{}] {} CONNECT {} via backend {}",
        ctx.group, peer, request, backend_addr
    );

    let backend = match connect_backend(backend_addr, &request, timeout, &ctx.socket_opts).await {
        HandshakeOutcome::Success(backend) => backend,
        HandshakeOutcome::BackendUnavailable { error, reply } => {
            warn!("[{}] Backend {} unavailable: {}", ctx.group, backend_addr, error);
            let _ = build_reply(&mut client, reply).await;
            return SessionEnd::BackendFailed;
        }
        HandshakeOutcome::ProtocolViolation { error, .. } => {
            warn!("[{}] Backend {} broke protocol: {}", ctx.group, backend_addr, error);
            let _ = build_reply(&mut client, Socks5ReplyCode::GeneralFailure.into()).await;
            return SessionEnd::BackendFailed;
        }
        HandshakeOutcome::Timeout => {
            warn!("[{}] Backend {} handshake timed out", ctx.group, backend_addr);
            let _ = build_reply(&mut client, Socks5ReplyCode::GeneralFailure.into()).await;
            return SessionEnd::BackendFailed;
        }
    };

    if build_reply(&mut client, Socks5ReplyCode::Succeeded.into())
        .await
        .is_err()
    {
        return SessionEnd::BackendFailed;
    }

    info!("[{}] Session {} -> {} established", ctx.group, peer, backend_addr);

    match relay_tcp(client, backend, ctx.buffer_size).await {
        Ok(stats) => debug!(
            "[{}] Session {} closed: {} bytes up, {} bytes down",
            ctx.group, peer, stats.client_to_backend, stats.backend_to_client
        ),
        Err(e) => debug!("[{}] Session {} ended with error: {}", ctx.group, peer, e),
    }

    SessionEnd::Relayed
}
