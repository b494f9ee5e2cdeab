//! Server role of the handshake, facing the connecting client
//!
//! Authentication methods offered by the client are read and ignored;
//! "no authentication" is always selected.

use super::consts::*;
use super::io::HandshakeIo;
use super::types::{ConnectRequest, HandshakeOutcome, SocksCommand};
use crate::error::{Socks5Error, Socks5ReplyCode};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::trace;

/// Run method negotiation and read the client's CONNECT request
///
/// Nothing is written unless the client's greeting carried version 5.
/// Replies owed on failure are left to the caller, named in the outcome.
pub async fn accept_connect<S>(
    stream: &mut S,
    timeout: Duration,
) -> HandshakeOutcome<ConnectRequest>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut io = HandshakeIo::new(stream, timeout);

    match read_connect(&mut io).await {
        Ok(request) => HandshakeOutcome::Success(request),
        Err(Socks5Error::Timeout) => HandshakeOutcome::Timeout,
        Err(error @ Socks5Error::CommandNotSupported(_)) => HandshakeOutcome::ProtocolViolation {
            error,
            reply: Some(Socks5ReplyCode::CommandNotSupported),
        },
        Err(error) => HandshakeOutcome::ProtocolViolation { error, reply: None },
    }
}

async fn read_connect<S>(io: &mut HandshakeIo<'_, S>) -> Result<ConnectRequest, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let [version, method_count] = io.read_array::<2>().await?;
    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    let methods = io.read_bytes(method_count as usize).await?;
    trace!("Client offered methods {:?}", &methods[..]);
    io.write_all(&METHOD_REPLY_NO_AUTH).await?;

    let [version, command, _reserved, addr_type] = io.read_array::<4>().await?;
    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }
    match SocksCommand::from_byte(command) {
        Some(SocksCommand::Connect) => {}
        Some(other) => {
            trace!("Client requested unsupported {}", other);
            return Err(Socks5Error::CommandNotSupported(command));
        }
        None => return Err(Socks5Error::CommandNotSupported(command)),
    }

    let address = io.read_address(addr_type).await?;
    let port = io.read_port().await?;

    ConnectRequest::new(addr_type, address, port)
}
