//! Test utilities and mocks for rrsocks
//!
//! Mock SOCKS5 backends, engine document builders and a minimal SOCKS5
//! client shared by the integration tests.

#![allow(dead_code)]

use rrsocks::config::{RelayConfig, SessionPolicy, TagConvention};
use serde_json::{json, Value};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Find a loopback port nobody is listening on
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Relay configuration tuned for tests
pub fn relay_config(policy: SessionPolicy) -> RelayConfig {
    RelayConfig {
        handshake_timeout: 2,
        buffer_size: 4096,
        session_policy: policy,
        ..Default::default()
    }
}

/// A loopback SOCKS5 server standing in for an engine inbound
///
/// On a successful CONNECT it writes its marker byte, then echoes.
pub struct MockBackend {
    /// Port the backend listens on
    pub port: u16,
    /// Number of handshakes it has answered
    pub hits: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Start a backend that accepts every CONNECT
    pub async fn spawn(marker: u8) -> Self {
        Self::spawn_with_status(marker, 0).await
    }

    /// Start a backend that answers CONNECT with `status`
    pub async fn spawn_with_status(marker: u8, status: u8) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let counter = counter.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, marker, status, counter).await;
                });
            }
        });

        MockBackend { port, hits }
    }

    /// Handshakes answered so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn serve(
    mut stream: TcpStream,
    marker: u8,
    status: u8,
    hits: Arc<AtomicUsize>,
) -> std::io::Result<()> {
    let mut head = [0u8; 2];
    stream.read_exact(&mut head).await?;
    let mut methods = vec![0u8; head[1] as usize];
    stream.read_exact(&mut methods).await?;
    stream.write_all(&[5, 0]).await?;

    let mut request = [0u8; 4];
    stream.read_exact(&mut request).await?;
    let addr_len = match request[3] {
        1 => 4,
        4 => 16,
        3 => stream.read_u8().await? as usize,
        _ => return Ok(()),
    };
    let mut rest = vec![0u8; addr_len + 2];
    stream.read_exact(&mut rest).await?;

    hits.fetch_add(1, Ordering::SeqCst);
    stream
        .write_all(&[5, status, 0, 1, 127, 0, 0, 1, 0x1f, 0x90])
        .await?;
    if status != 0 {
        return Ok(());
    }

    stream.write_all(&[marker]).await?;
    let (mut reader, mut writer) = stream.split();
    tokio::io::copy(&mut reader, &mut writer).await?;
    Ok(())
}

/// Builder for an engine document declaring relay groups
#[derive(Default)]
pub struct DocumentBuilder {
    tags: TagConvention,
    inbounds: Vec<Value>,
    outbounds: Vec<Value>,
}

impl DocumentBuilder {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a group with its listen port and ordered backend ports
    pub fn group(mut self, id: &str, listen_port: u16, backends: &[u16]) -> Self {
        self.outbounds.push(json!({
            "tag": self.tags.listen_tag(id),
            "type": self.tags.kind,
            "server": self.tags.loopback,
            "server_port": listen_port,
        }));
        for (idx, port) in backends.iter().enumerate() {
            self.inbounds.push(json!({
                "tag": self.tags.backend_tag(id, idx as i64),
                "type": self.tags.kind,
                "listen": "127.0.0.1",
                "listen_port": port,
            }));
        }
        self
    }

    /// Write the document to a temporary file
    pub fn write(self) -> NamedTempFile {
        let document = json!({
            "log": { "level": "warn" },
            "inbounds": self.inbounds,
            "outbounds": self.outbounds,
        });
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(document.to_string().as_bytes()).unwrap();
        file
    }
}

/// Negotiate no-auth and send CONNECT 1.2.3.4:80, returning the 10-byte reply
pub async fn socks5_connect(port: u16) -> (TcpStream, [u8; 10]) {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(&[5, 1, 0]).await.unwrap();
    let mut method = [0u8; 2];
    stream.read_exact(&mut method).await.unwrap();
    assert_eq!(method, [5, 0]);

    stream
        .write_all(&[5, 1, 0, 1, 1, 2, 3, 4, 0, 80])
        .await
        .unwrap();
    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await.unwrap();
    (stream, reply)
}
