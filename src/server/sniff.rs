//! First-byte protocol detection.

use std::io;
use tokio::net::TcpStream;

/// Content type of a TLS handshake record, the first byte a TLS client sends.
pub(crate) const TLS_HANDSHAKE: u8 = 22;

/// What the client opened the connection with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Protocol {
    Tls,
    Plaintext,
}

impl Protocol {
    #[inline]
    pub(crate) const fn classify(first_byte: u8) -> Self {
        match first_byte {
            TLS_HANDSHAKE => Protocol::Tls,
            _ => Protocol::Plaintext,
        }
    }
}

/// Peeks at the first byte without consuming it.
///
/// Waits until the client sends something. Returns `None` when the peer
/// closes the connection before sending a single byte.
pub(crate) async fn sniff(stream: &TcpStream) -> io::Result<Option<Protocol>> {
    let mut first = [0u8; 1];

    match stream.peek(&mut first).await? {
        0 => Ok(None),
        _ => Ok(Some(Protocol::classify(first[0]))),
    }
}
