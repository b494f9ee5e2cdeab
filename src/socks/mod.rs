//! SOCKS5 module for rrsocks
//!
//! A minimal SOCKS5 subset spoken twice per session: as a server toward the
//! connecting client and as a client toward the selected backend. Only
//! no-auth negotiation and CONNECT are supported; destination addresses are
//! passed through opaquely.

mod client;
mod consts;
mod handler;
mod io;
mod reply;
mod server;
mod tcp_relay;
mod types;

pub use client::{connect_backend, handshake as backend_handshake};
pub use consts::*;
pub use handler::{handle_connection, SessionContext, SessionEnd};
pub use reply::{build_reply, reply_bytes};
pub use server::accept_connect;
pub use tcp_relay::{relay_tcp, RelayStats};
pub use types::{ConnectRequest, HandshakeOutcome, SocksCommand};
