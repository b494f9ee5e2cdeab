//! Error types for rrsocks
//!
//! This module defines all custom error types used throughout the relay.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience result alias for supervisor operations
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Main error type for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The engine document could not be read
    #[error("Failed to read document {path:?}: {source}")]
    DocumentRead {
        /// Path of the document
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// The engine document is not valid JSON
    #[error("Failed to parse document {path:?}: {source}")]
    DocumentParse {
        /// Path of the document
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A group listener could not be bound
    #[error("Failed to bind listener for group '{group}' on port {port}: {source}")]
    Bind {
        /// Group id
        group: String,
        /// Listen port
        port: u16,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// SOCKS5 specific errors
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Command not supported
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Backend did not accept the no-auth method
    #[error("Backend rejected method negotiation: {0:#04x} {1:#04x}")]
    MethodRejected(u8, u8),

    /// Backend answered the CONNECT request with a non-zero status
    #[error("Backend replied with status {0}")]
    BackendStatus(u8),

    /// Backend could not be reached
    #[error("Backend on port {port} unreachable: {source}")]
    BackendConnect {
        /// Backend port
        port: u16,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// A handshake read or write did not complete in time
    #[error("Handshake timed out")]
    Timeout,

    /// IO failure or short read during the handshake
    #[error("Handshake IO error: {0}")]
    Io(#[from] io::Error),
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socks5_reply_code_to_u8() {
        assert_eq!(u8::from(Socks5ReplyCode::Succeeded), 0x00);
        assert_eq!(u8::from(Socks5ReplyCode::GeneralFailure), 0x01);
        assert_eq!(u8::from(Socks5ReplyCode::CommandNotSupported), 0x07);
        assert_eq!(u8::from(Socks5ReplyCode::AddressTypeNotSupported), 0x08);
    }

    #[test]
    fn test_relay_error_display() {
        let err = RelayError::Config("zero timeout".to_string());
        assert_eq!(format!("{}", err), "Configuration error: zero timeout");

        let err = RelayError::Bind {
            group: "hk".to_string(),
            port: 1080,
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(
            format!("{}", err),
            "Failed to bind listener for group 'hk' on port 1080: in use"
        );
    }

    #[test]
    fn test_relay_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::Other, "io error");
        let err: RelayError = io_err.into();
        assert!(matches!(err, RelayError::Io(_)));
    }

    #[test]
    fn test_socks5_error_display() {
        let err = Socks5Error::UnsupportedVersion(4);
        assert_eq!(format!("{}", err), "Unsupported SOCKS version: 4");

        let err = Socks5Error::CommandNotSupported(2);
        assert_eq!(format!("{}", err), "Command not supported: 2");

        let err = Socks5Error::AddressTypeNotSupported(0x99);
        assert_eq!(format!("{}", err), "Address type not supported: 153");

        let err = Socks5Error::MethodRejected(5, 0xFF);
        assert_eq!(
            format!("{}", err),
            "Backend rejected method negotiation: 0x05 0xff"
        );

        let err = Socks5Error::BackendStatus(5);
        assert_eq!(format!("{}", err), "Backend replied with status 5");

        let err = Socks5Error::Timeout;
        assert_eq!(format!("{}", err), "Handshake timed out");
    }
}
