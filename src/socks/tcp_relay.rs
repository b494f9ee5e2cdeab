//! Bidirectional byte relay for established sessions
//!
//! Both sockets are polled from a single loop; whichever side reports
//! end-of-stream or an error first ends the whole session.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Bytes moved in each direction by a finished relay
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from the client to the backend
    pub client_to_backend: u64,
    /// Bytes copied from the backend to the client
    pub backend_to_client: u64,
}

/// Relay data between `client` and `backend` until either side closes
///
/// Reads use two buffers of `buffer_size` bytes. Payload is copied
/// unmodified. On return both write halves have been shut down on a
/// best-effort basis; dropping the streams closes them.
pub async fn relay_tcp<A, B>(client: A, backend: B, buffer_size: usize) -> io::Result<RelayStats>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut backend_read, mut backend_write) = tokio::io::split(backend);

    let mut upstream = vec![0u8; buffer_size];
    let mut downstream = vec![0u8; buffer_size];
    let mut stats = RelayStats::default();

    let result = loop {
        tokio::select! {
            read = client_read.read(&mut upstream) => {
                match read {
                    Ok(0) => {
                        debug!("Client closed after {} bytes up", stats.client_to_backend);
                        break Ok(());
                    }
                    Ok(n) => {
                        if let Err(e) = backend_write.write_all(&upstream[..n]).await {
                            break Err(e);
                        }
                        stats.client_to_backend += n as u64;
                    }
                    Err(e) => break Err(e),
                }
            }
            read = backend_read.read(&mut downstream) => {
                match read {
                    Ok(0) => {
                        debug!("Backend closed after {} bytes down", stats.backend_to_client);
                        break Ok(());
                    }
                    Ok(n) => {
                        if let Err(e) = client_write.write_all(&downstream[..n]).await {
                            break Err(e);
                        }
                        stats.backend_to_client += n as u64;
                    }
                    Err(e) => break Err(e),
                }
            }
        }
    };

    let _ = client_write.shutdown().await;
    let _ = backend_write.shutdown().await;

    result.map(|()| stats)
}
