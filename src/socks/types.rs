//! SOCKS5 type definitions
//!
//! Defines the core types used in SOCKS5 protocol handling.

use super::consts::*;
use crate::error::{Socks5Error, Socks5ReplyCode};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for incoming connection (not supported)
    Bind,
    /// UDP ASSOCIATE - establish UDP relay (not supported)
    UdpAssociate,
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => Some(SocksCommand::Connect),
            SOCKS5_CMD_TCP_BIND => Some(SocksCommand::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Some(SocksCommand::UdpAssociate),
            _ => None,
        }
    }
}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksCommand::Connect => write!(f, "CONNECT"),
            SocksCommand::Bind => write!(f, "BIND"),
            SocksCommand::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// A client's CONNECT request, kept in wire form
///
/// The destination is never resolved or interpreted by the relay; it is
/// forwarded to the backend byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Address type byte (ATYP)
    pub addr_type: u8,
    /// Address body as read from the wire, domain form includes its length byte
    pub address: Bytes,
    /// Destination port
    pub port: u16,
}

impl ConnectRequest {
    /// Build a request, checking the address body against its type
    pub fn new(addr_type: u8, address: Bytes, port: u16) -> Result<Self, Socks5Error> {
        let valid = match addr_type {
            SOCKS5_ADDR_TYPE_IPV4 => address.len() == 4,
            SOCKS5_ADDR_TYPE_IPV6 => address.len() == 16,
            SOCKS5_ADDR_TYPE_DOMAIN => {
                !address.is_empty() && address[0] as usize == address.len() - 1
            }
            other => return Err(Socks5Error::AddressTypeNotSupported(other)),
        };
        if !valid {
            return Err(Socks5Error::AddressTypeNotSupported(addr_type));
        }
        Ok(ConnectRequest {
            addr_type,
            address,
            port,
        })
    }

    /// Encode the request as sent to a backend
    ///
    /// ```text
    /// +----+-----+-------+------+----------+----------+
    /// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
    /// +----+-----+-------+------+----------+----------+
    /// ```
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.address.len() + 2);
        buf.put_u8(SOCKS5_VERSION);
        buf.put_u8(SOCKS5_CMD_TCP_CONNECT);
        buf.put_u8(SOCKS5_RESERVED);
        buf.put_u8(self.addr_type);
        buf.extend_from_slice(&self.address);
        buf.put_u16(self.port);
        buf.freeze()
    }
}

impl fmt::Display for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr_type {
            SOCKS5_ADDR_TYPE_IPV4 if self.address.len() == 4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(&self.address);
                write!(f, "{}:{}", Ipv4Addr::from(octets), self.port)
            }
            SOCKS5_ADDR_TYPE_IPV6 if self.address.len() == 16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&self.address);
                write!(f, "[{}]:{}", Ipv6Addr::from(octets), self.port)
            }
            SOCKS5_ADDR_TYPE_DOMAIN if !self.address.is_empty() => {
                let domain = String::from_utf8_lossy(&self.address[1..]);
                write!(f, "{}:{}", domain, self.port)
            }
            _ => write!(f, "<atyp {}>:{}", self.addr_type, self.port),
        }
    }
}

/// Result of one handshake role
///
/// The connection handler turns every non-success variant into "send the
/// indicated reply, if any, then close".
#[derive(Debug)]
pub enum HandshakeOutcome<T> {
    /// The handshake completed
    Success(T),
    /// The peer broke the protocol
    ProtocolViolation {
        /// What went wrong
        error: Socks5Error,
        /// Reply owed to the client before closing, if the exchange got far enough
        reply: Option<Socks5ReplyCode>,
    },
    /// The selected backend could not be used
    BackendUnavailable {
        /// What went wrong
        error: Socks5Error,
        /// Status byte to relay to the client
        reply: u8,
    },
    /// A handshake operation exceeded its timeout
    Timeout,
}

impl<T> HandshakeOutcome<T> {
    /// Map the success value, leaving failures untouched
    pub fn map<U, F>(self, f: F) -> HandshakeOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            HandshakeOutcome::Success(value) => HandshakeOutcome::Success(f(value)),
            HandshakeOutcome::ProtocolViolation { error, reply } => {
                HandshakeOutcome::ProtocolViolation { error, reply }
            }
            HandshakeOutcome::BackendUnavailable { error, reply } => {
                HandshakeOutcome::BackendUnavailable { error, reply }
            }
            HandshakeOutcome::Timeout => HandshakeOutcome::Timeout,
        }
    }
}
