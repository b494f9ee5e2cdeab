//! SOCKS5 reply builder
//!
//! Every reply the relay sends carries the placeholder bound address
//! `0.0.0.0:0`; clients only look at the status byte.

use super::consts::*;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Encode a reply with the placeholder bound address
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | 0.0.0.0  |    0     |
/// +----+-----+-------+------+----------+----------+
/// ```
pub fn reply_bytes(reply_code: u8) -> [u8; 10] {
    [
        SOCKS5_VERSION,
        reply_code,
        SOCKS5_RESERVED,
        SOCKS5_ADDR_TYPE_IPV4,
        0,
        0,
        0,
        0,
        0,
        0,
    ]
}

/// Build and send a SOCKS5 reply
pub async fn build_reply<S>(stream: &mut S, reply_code: u8) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&reply_bytes(reply_code)).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Socks5ReplyCode;

    #[test]
    fn test_reply_bytes_success() {
        assert_eq!(reply_bytes(0), [5, 0, 0, 1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_reply_bytes_various_codes() {
        let codes = [
            Socks5ReplyCode::Succeeded,
            Socks5ReplyCode::GeneralFailure,
            Socks5ReplyCode::ConnectionRefused,
            Socks5ReplyCode::HostUnreachable,
            Socks5ReplyCode::CommandNotSupported,
        ];

        for code in codes {
            let reply = reply_bytes(code.into());
            assert_eq!(reply[1], u8::from(code));
            assert_eq!(&reply[3..], &[1, 0, 0, 0, 0, 0, 0]);
        }
    }

    #[tokio::test]
    async fn test_build_reply_async() {
        let mut buffer = Vec::new();

        build_reply(&mut buffer, Socks5ReplyCode::CommandNotSupported.into())
            .await
            .unwrap();

        assert_eq!(buffer, vec![5, 7, 0, 1, 0, 0, 0, 0, 0, 0]);
    }
}
