//! TCP listener and dialler

use super::SocketOpts;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Listen backlog for group listeners
const LISTEN_BACKLOG: i32 = 1024;

/// Bind a listening socket
///
/// `SO_REUSEADDR` is set on unix so a port released by a previous
/// generation can be bound again right away.
pub fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    #[cfg(unix)]
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    TcpListener::from_std(socket.into())
}

/// Dial `addr` within `timeout` and apply socket options
///
/// An elapsed timeout is reported as [`io::ErrorKind::TimedOut`].
pub async fn connect(
    addr: SocketAddr,
    timeout: Duration,
    opts: &SocketOpts,
) -> io::Result<TcpStream> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {} timed out", addr),
            )
        })??;

    if let Err(e) = opts.apply(&stream) {
        tracing::warn!("Failed to apply socket options to {}: {}", addr, e);
    }

    tracing::debug!("TCP connection established to {}", addr);

    Ok(stream)
}
