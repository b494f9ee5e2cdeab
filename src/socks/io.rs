//! Handshake framing helpers
//!
//! Exact-length reads and whole-buffer writes, each bounded by the
//! per-operation handshake timeout. Shared by the server and client roles.

use super::consts::*;
use crate::error::Socks5Error;
use bytes::{BufMut, Bytes, BytesMut};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A stream borrowed for the duration of a handshake
pub(crate) struct HandshakeIo<'a, S> {
    stream: &'a mut S,
    timeout: Duration,
}

impl<'a, S> HandshakeIo<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: &'a mut S, timeout: Duration) -> Self {
        HandshakeIo { stream, timeout }
    }

    /// Read exactly `N` bytes
    pub(crate) async fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Socks5Error> {
        let mut buf = [0u8; N];
        bounded(self.timeout, self.stream.read_exact(&mut buf)).await?;
        Ok(buf)
    }

    /// Read exactly `len` bytes into an owned buffer
    pub(crate) async fn read_bytes(&mut self, len: usize) -> Result<Bytes, Socks5Error> {
        let mut buf = vec![0u8; len];
        bounded(self.timeout, self.stream.read_exact(&mut buf)).await?;
        Ok(Bytes::from(buf))
    }

    /// Write the whole buffer and flush
    pub(crate) async fn write_all(&mut self, buf: &[u8]) -> Result<(), Socks5Error> {
        let stream = &mut *self.stream;
        let op = async move {
            stream.write_all(buf).await?;
            stream.flush().await
        };
        bounded(self.timeout, op).await
    }

    /// Read a SOCKS5 address body for `addr_type`, exactly as it appears on the wire
    ///
    /// The domain form keeps its leading length byte so the result can be
    /// forwarded verbatim.
    pub(crate) async fn read_address(&mut self, addr_type: u8) -> Result<Bytes, Socks5Error> {
        match addr_type {
            SOCKS5_ADDR_TYPE_IPV4 => self.read_bytes(4).await,
            SOCKS5_ADDR_TYPE_IPV6 => self.read_bytes(16).await,
            SOCKS5_ADDR_TYPE_DOMAIN => {
                let [len] = self.read_array::<1>().await?;
                let domain = self.read_bytes(len as usize).await?;
                let mut address = BytesMut::with_capacity(1 + domain.len());
                address.put_u8(len);
                address.extend_from_slice(&domain);
                Ok(address.freeze())
            }
            other => Err(Socks5Error::AddressTypeNotSupported(other)),
        }
    }

    /// Read a big-endian port
    pub(crate) async fn read_port(&mut self) -> Result<u16, Socks5Error> {
        Ok(u16::from_be_bytes(self.read_array::<2>().await?))
    }
}

async fn bounded<T, F>(timeout: Duration, op: F) -> Result<T, Socks5Error>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(Socks5Error::Timeout),
    }
}
