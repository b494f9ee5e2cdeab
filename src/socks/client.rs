//! Client role of the handshake, facing the selected backend
//!
//! Opens a fresh connection to the backend, negotiates no-auth, forwards the
//! client's CONNECT request verbatim and consumes the backend's reply. The
//! backend's bound address is discarded.

use super::consts::*;
use super::io::HandshakeIo;
use super::types::{ConnectRequest, HandshakeOutcome};
use crate::error::{Socks5Error, Socks5ReplyCode};
use crate::transport::{self, SocketOpts};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Dial the backend at `addr` and run the client handshake on it
pub async fn connect_backend(
    addr: SocketAddr,
    request: &ConnectRequest,
    timeout: Duration,
    opts: &SocketOpts,
) -> HandshakeOutcome<TcpStream> {
    let mut stream = match transport::connect(addr, timeout, opts).await {
        Ok(stream) => stream,
        Err(e) if e.kind() == io::ErrorKind::TimedOut => return HandshakeOutcome::Timeout,
        Err(source) => {
            return HandshakeOutcome::BackendUnavailable {
                error: Socks5Error::BackendConnect {
                    port: addr.port(),
                    source,
                },
                reply: Socks5ReplyCode::GeneralFailure.into(),
            }
        }
    };

    handshake(&mut stream, request, timeout)
        .await
        .map(|()| stream)
}

/// Run the client handshake on an already connected backend stream
///
/// A non-zero backend status is reported as that exact status; every other
/// failure is reported as general failure.
pub async fn handshake<S>(
    stream: &mut S,
    request: &ConnectRequest,
    timeout: Duration,
) -> HandshakeOutcome<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut io = HandshakeIo::new(stream, timeout);

    match negotiate(&mut io, request).await {
        Ok(()) => HandshakeOutcome::Success(()),
        Err(Socks5Error::Timeout) => HandshakeOutcome::Timeout,
        Err(Socks5Error::BackendStatus(status)) => HandshakeOutcome::BackendUnavailable {
            error: Socks5Error::BackendStatus(status),
            reply: status,
        },
        Err(error) => HandshakeOutcome::BackendUnavailable {
            error,
            reply: Socks5ReplyCode::GeneralFailure.into(),
        },
    }
}

async fn negotiate<S>(io: &mut HandshakeIo<'_, S>, request: &ConnectRequest) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    io.write_all(&METHOD_REQUEST_NO_AUTH).await?;

    let [version, method] = io.read_array::<2>().await?;
    if [version, method] != METHOD_REPLY_NO_AUTH {
        return Err(Socks5Error::MethodRejected(version, method));
    }

    io.write_all(&request.to_bytes()).await?;

    let [version, status, _reserved, addr_type] = io.read_array::<4>().await?;
    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }
    if status != u8::from(Socks5ReplyCode::Succeeded) {
        return Err(Socks5Error::BackendStatus(status));
    }

    let bound = io.read_address(addr_type).await?;
    let bound_port = io.read_port().await?;
    debug!(
        "Backend accepted CONNECT {} (bound address {} bytes, port {})",
        request,
        bound.len(),
        bound_port
    );

    Ok(())
}
