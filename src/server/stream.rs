//! Accepted socket that may be upgraded to TLS in place.

use crate::{
    errors::ErrorKind,
    server::{
        sniff::{self, Protocol},
        tls::TlsConfig,
    },
};
use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf},
    net::TcpStream,
};
use tokio_rustls::server::TlsStream;

/// A TCP stream that is plain until [`start_encryption`](Stream::start_encryption)
/// succeeds.
pub(crate) enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
    #[inline]
    pub(crate) fn new(sock: TcpStream) -> Self {
        Stream::Plain(sock)
    }

    /// Looks at the first byte without consuming it.
    ///
    /// Only meaningful before the upgrade; an encrypted stream reports
    /// [`Protocol::Tls`] without touching the socket.
    #[inline]
    pub(crate) async fn peek(&self) -> io::Result<Option<Protocol>> {
        match self {
            Stream::Plain(sock) => sniff::sniff(sock).await,
            Stream::Tls(_) => Ok(Some(Protocol::Tls)),
        }
    }

    /// Runs the server side of the TLS handshake.
    ///
    /// The handshake bytes are still unread, so the acceptor sees the
    /// whole `ClientHello`.
    pub(crate) async fn start_encryption(self, tls: &TlsConfig) -> Result<Self, ErrorKind> {
        match self {
            Stream::Plain(sock) => tls
                .acceptor()
                .accept(sock)
                .await
                .map(|stream| Stream::Tls(Box::new(stream)))
                .map_err(ErrorKind::handshake),
            Stream::Tls(_) => Ok(self),
        }
    }

    #[inline(always)]
    pub(crate) const fn is_encrypted(&self) -> bool {
        matches!(self, Stream::Tls(_))
    }

    /// Flushes and shuts down the write half (sends `close_notify` first
    /// on TLS).
    #[inline]
    pub(crate) async fn close(&mut self) -> io::Result<()> {
        self.shutdown().await
    }
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(sock) => Pin::new(sock).poll_read(cx, buf),
            Stream::Tls(sock) => Pin::new(sock.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(sock) => Pin::new(sock).poll_write(cx, buf),
            Stream::Tls(sock) => Pin::new(sock.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(sock) => Pin::new(sock).poll_flush(cx),
            Stream::Tls(sock) => Pin::new(sock.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(sock) => Pin::new(sock).poll_shutdown(cx),
            Stream::Tls(sock) => Pin::new(sock.as_mut()).poll_shutdown(cx),
        }
    }
}
