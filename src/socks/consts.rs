//! SOCKS5 protocol constants
//!
//! Only the subset spoken by the relay: no-auth negotiation and CONNECT.

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;

// Commands
/// TCP CONNECT command
pub const SOCKS5_CMD_TCP_CONNECT: u8 = 0x01;
/// TCP BIND command (rejected)
pub const SOCKS5_CMD_TCP_BIND: u8 = 0x02;
/// UDP ASSOCIATE command (rejected)
pub const SOCKS5_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

// Reserved byte
/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

/// Method-selection reply sent to every client: version 5, no authentication
pub const METHOD_REPLY_NO_AUTH: [u8; 2] = [SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE];

/// Negotiation request sent to every backend: one method offered, no-auth
pub const METHOD_REQUEST_NO_AUTH: [u8; 3] = [SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE];
