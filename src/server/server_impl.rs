use crate::{
    http::{request::Request, response::Response},
    limits::{ConnLimits, ServerLimits},
    server::{
        connection::{Connection, ServeContext},
        router::{Handler, Router},
        tls::TlsConfig,
    },
    Method,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    future::Future,
    io,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tokio::net::TcpListener;

/// A single-port HTTP and HTTPS server.
///
/// Every accepted connection is inspected before anything is read: a TLS
/// handshake record is answered with a handshake (when a [`TlsConfig`] is
/// set), anything else is treated as plaintext HTTP. Each connection
/// carries exactly one request and is closed after the response.
///
/// Plaintext traffic is either served from the route table
/// ([`set_serve_plaintext`](Self::set_serve_plaintext), the default) or
/// redirected to `https://` ([`set_redirect_to_https`](Self::set_redirect_to_https)).
/// Enabling one mode turns the other off. Disabling the active mode
/// leaves neither on, which makes the server HTTPS-only: plaintext
/// connections are then closed without a response.
///
/// # Examples
///
/// ```no_run
/// use dual_web::{Method, Request, Response, Server, StatusCode};
/// use std::net::Ipv4Addr;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> std::io::Result<()> {
///     let mut server = Server::new(Ipv4Addr::UNSPECIFIED.into(), 8080);
///
///     server.register(Method::Get, "/", |_: &Request, _: &str| {
///         let mut resp = Response::with_status(StatusCode::Ok);
///         resp.set_body("Home");
///         resp
///     });
///
///     server.launch().await
/// }
/// ```
pub struct Server {
    address: IpAddr,
    port: u16,
    router: Router,
    tls: Option<TlsConfig>,

    serve_plaintext: bool,
    redirect_to_https: bool,

    server_limits: ServerLimits,
    conn_limits: ConnLimits,
}

impl Server {
    /// Creates a server for `address:port` with plaintext serving enabled,
    /// no TLS and an empty route table.
    #[inline]
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self {
            address,
            port,
            router: Router::default(),
            tls: None,

            serve_plaintext: true,
            redirect_to_https: false,

            server_limits: ServerLimits::default(),
            conn_limits: ConnLimits::default(),
        }
    }
}

// Configuration
impl Server {
    /// Enables TLS with the given certificate and key.
    #[inline]
    pub fn set_tls_config(&mut self, tls: TlsConfig) -> &mut Self {
        self.tls = Some(tls);
        self
    }

    /// Disables TLS; handshakes are then dropped on arrival.
    #[inline]
    pub fn clear_tls_config(&mut self) -> &mut Self {
        self.tls = None;
        self
    }

    /// Serves plaintext requests from the route table.
    ///
    /// Enabling it turns [HTTPS redirection](Self::set_redirect_to_https) off.
    /// Disabling it while redirection is off makes the server HTTPS-only.
    ///
    /// # Examples
    /// ```
    /// use dual_web::Server;
    /// use std::net::Ipv4Addr;
    ///
    /// let mut server = Server::new(Ipv4Addr::LOCALHOST.into(), 8443);
    /// server.set_serve_plaintext(false);
    ///
    /// // Neither plaintext mode: plaintext connections are dropped.
    /// assert!(!server.serve_plaintext());
    /// assert!(!server.redirect_to_https());
    /// ```
    #[inline]
    pub fn set_serve_plaintext(&mut self, enable: bool) -> &mut Self {
        self.serve_plaintext = enable;
        if enable {
            self.redirect_to_https = false;
        }
        self
    }

    /// Answers every plaintext request with `301` to the `https://` URL.
    ///
    /// Enabling it turns [plaintext serving](Self::set_serve_plaintext) off.
    #[inline]
    pub fn set_redirect_to_https(&mut self, enable: bool) -> &mut Self {
        self.redirect_to_https = enable;
        if enable {
            self.serve_plaintext = false;
        }
        self
    }

    #[inline(always)]
    pub fn set_server_limits(&mut self, limits: ServerLimits) -> &mut Self {
        self.server_limits = limits;
        self
    }

    /// Sets the per-connection limits.
    ///
    /// A `read_buffer_size` of `0` is raised to `1`.
    #[inline]
    pub fn set_conn_limits(&mut self, mut limits: ConnLimits) -> &mut Self {
        if limits.read_buffer_size == 0 {
            tracing::warn!("read_buffer_size of 0 raised to 1");
            limits.read_buffer_size = 1;
        }

        self.conn_limits = limits;
        self
    }

    #[inline(always)]
    pub const fn serve_plaintext(&self) -> bool {
        self.serve_plaintext
    }

    #[inline(always)]
    pub const fn redirect_to_https(&self) -> bool {
        self.redirect_to_https
    }

    #[inline(always)]
    pub fn tls_config(&self) -> Option<&TlsConfig> {
        self.tls.as_ref()
    }

    /// Returns the configured listen address.
    #[inline(always)]
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

// Routes
impl Server {
    /// Binds `handler` to the exact `method` and `path`, replacing any
    /// previous handler for that pair.
    ///
    /// Changes take effect the next time serving starts.
    pub fn register<P, H>(&mut self, method: Method, path: P, handler: H) -> &mut Self
    where
        P: Into<String>,
        H: Handler,
    {
        let path = path.into();
        if self.router.register(method, path.clone(), handler) {
            tracing::debug!(%method, path = %path, "handler replaced");
        }
        self
    }

    /// Removes the handler for `method` and `path`, if any.
    #[inline]
    pub fn unregister(&mut self, method: Method, path: &str) -> &mut Self {
        self.router.unregister(method, path);
        self
    }

    /// Runs the route table and response defaults on a request without any
    /// socket, as a plaintext request would be handled.
    ///
    /// # Examples
    /// ```
    /// use dual_web::{Method, Request, Server, StatusCode};
    /// use std::net::Ipv4Addr;
    ///
    /// let server = Server::new(Ipv4Addr::LOCALHOST.into(), 8080);
    /// let resp = server.handle(&Request::parse(b"GET /nothing HTTP/1.1\r\n\r\n"));
    ///
    /// assert_eq!(resp.status(), StatusCode::NotFound);
    /// assert_eq!(resp.body(), b"404 Not Found");
    /// ```
    pub fn handle(&self, request: &Request) -> Response {
        let log_info = match request.client_addr() {
            Some(addr) => addr.to_string(),
            None => String::from("local"),
        };

        self.context().respond(request, false, &log_info)
    }

    #[inline]
    fn context(&self) -> ServeContext {
        ServeContext {
            router: self.router.clone(),
            tls: self.tls.clone(),
            serve_plaintext: self.serve_plaintext,
            redirect_to_https: self.redirect_to_https,
            conn_limits: self.conn_limits.clone(),
        }
    }
}

// Lifecycle
impl Server {
    /// Creates the listening socket.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn bind(&self) -> io::Result<TcpListener> {
        let addr = self.address();

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(self.server_limits.reuse_address)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(self.server_limits.backlog)?;

        let listener = TcpListener::from_std(socket.into())?;
        tracing::info!(address = %listener.local_addr()?, "listening");

        Ok(listener)
    }

    /// Accepts connections on `listener` until `shutdown` completes.
    ///
    /// The route table and flags are snapshotted when this is called.
    /// Connections already accepted keep running after shutdown; the
    /// listener itself is dropped.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let ctx = Arc::new(self.context());

        tracing::info!(
            routes = ctx.router.len(),
            tls = ctx.tls.is_some(),
            serve_plaintext = ctx.serve_plaintext,
            redirect_to_https = ctx.redirect_to_https,
            "serving"
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((sock, peer)) => {
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            Connection::new(peer).serve(sock, &ctx).await;
                        });
                    }
                    Err(err) => tracing::error!("failed to accept connection: {err}"),
                },
            }
        }

        tracing::info!("stopped serving");
    }

    /// Binds and serves until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind()?;
        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Binds and serves forever.
    #[inline]
    pub async fn launch(&self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }
}
