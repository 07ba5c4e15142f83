//! Per-connection lifecycle: sniff, optional TLS upgrade, one request, one
//! response, close.

use crate::{
    errors::ErrorKind,
    http::{request::Request, response::Response},
    limits::ConnLimits,
    server::{
        redirect::redirect,
        router::Router,
        sniff::Protocol,
        stream::Stream,
        tls::TlsConfig,
    },
};
use std::{
    fmt,
    net::SocketAddr,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique connection number, used in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ConnectionId(u64);

impl ConnectionId {
    #[inline]
    pub(crate) fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a connection is in its single request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Opened,
    Sniffing,
    Handshaking,
    Reading,
    Dispatching,
    Writing,
    Closed,
}

/// Everything a connection needs from the server, frozen when serving starts.
#[derive(Debug)]
pub(crate) struct ServeContext {
    pub(crate) router: Router,
    pub(crate) tls: Option<TlsConfig>,
    pub(crate) serve_plaintext: bool,
    pub(crate) redirect_to_https: bool,
    pub(crate) conn_limits: ConnLimits,
}

impl ServeContext {
    /// Picks the redirect or the route table and applies the response
    /// defaults.
    pub(crate) fn respond(&self, request: &Request, encrypted: bool, log_info: &str) -> Response {
        let mut response = match !encrypted && self.redirect_to_https {
            true => redirect(request),
            false => self.router.dispatch(request, log_info),
        };

        response.finalize();
        response
    }
}

pub(crate) struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    state: ConnectionState,
    log_info: String,
}

impl Connection {
    #[inline]
    pub(crate) fn new(peer: SocketAddr) -> Self {
        let id = ConnectionId::next();

        Self {
            id,
            peer,
            state: ConnectionState::Opened,
            log_info: format!("{peer} {id}"),
        }
    }

    #[inline]
    fn set_state(&mut self, state: ConnectionState) {
        tracing::trace!(conn = %self.id, from = ?self.state, to = ?state, "connection state");
        self.state = state;
    }

    /// Serves the connection to the end and logs how it ended.
    ///
    /// Never fails: every error is logged and the socket is dropped.
    pub(crate) async fn serve(mut self, sock: TcpStream, ctx: &ServeContext) {
        tracing::debug!(conn = %self.id, peer_addr = %self.peer, "connection accepted");

        match self.run(Stream::new(sock), ctx).await {
            Ok(()) => {}
            Err(ErrorKind::Closed) => {
                tracing::debug!(conn = %self.id, peer_addr = %self.peer, "closed before request");
            }
            Err(err) if err.is_config() => {
                tracing::warn!(conn = %self.id, peer_addr = %self.peer, "dropping connection: {err}");
            }
            Err(err) => {
                tracing::warn!(
                    conn = %self.id,
                    peer_addr = %self.peer,
                    state = ?self.state,
                    "connection failed: {err}"
                );
            }
        }

        self.set_state(ConnectionState::Closed);
        tracing::debug!(conn = %self.id, peer_addr = %self.peer, "connection closed");
    }

    async fn run(&mut self, mut stream: Stream, ctx: &ServeContext) -> Result<(), ErrorKind> {
        self.set_state(ConnectionState::Sniffing);

        let protocol = stream.peek().await?.ok_or(ErrorKind::Closed)?;

        match protocol {
            Protocol::Tls => {
                let tls = ctx.tls.as_ref().ok_or(ErrorKind::TlsNotConfigured)?;

                self.set_state(ConnectionState::Handshaking);
                stream = stream.start_encryption(tls).await?;
            }
            Protocol::Plaintext if !ctx.serve_plaintext && !ctx.redirect_to_https => {
                return Err(ErrorKind::PlaintextDisabled);
            }
            Protocol::Plaintext => {}
        }

        self.set_state(ConnectionState::Reading);
        let mut buffer = vec![0u8; ctx.conn_limits.read_buffer_size];
        let len = stream.read(&mut buffer).await?;
        if len == 0 {
            return Err(ErrorKind::Closed);
        }

        self.set_state(ConnectionState::Dispatching);
        let mut request = Request::parse(&buffer[..len]);
        request.client_addr = Some(self.peer);

        let response = ctx.respond(&request, stream.is_encrypted(), &self.log_info);

        tracing::debug!(
            conn = %self.id,
            peer_addr = %self.peer,
            tls = stream.is_encrypted(),
            method = %request.method(),
            uri = request.target_raw(),
            status = response.status().as_u16(),
            "request served"
        );

        self.set_state(ConnectionState::Writing);
        stream.write_all(&response.encode()).await?;
        stream.close().await?;

        Ok(())
    }
}
