//! dual_web - HTTP and HTTPS on one port
//!
//! A small server that accepts plain HTTP and TLS-wrapped HTTP on the same
//! listening socket, tells them apart by the first byte the client sends,
//! and answers each connection with exactly one response.
//!
//! # How a connection is handled
//!
//! 1. The first byte is peeked. `22` (a TLS handshake record) starts a
//!    server-side handshake when a [`TlsConfig`] is set and drops the
//!    connection otherwise. Anything else is plaintext.
//! 2. One read fills the request buffer ([`ConnLimits`](limits::ConnLimits)).
//! 3. The bytes are parsed into a [`Request`]. Parsing never fails; broken
//!    input yields an invalid request.
//! 4. Plaintext with [HTTPS redirection](Server::set_redirect_to_https) on
//!    gets a `301` to the `https://` URL. Everything else goes to the route
//!    table: invalid request `400`, unknown route `404`, otherwise the
//!    registered [`Handler`].
//! 5. Empty error responses get a short body, and `Date`, `Server` and
//!    `Connection: close` are added when missing.
//! 6. The response is written and the connection closed. There is no
//!    keep-alive.
//!
//! # Routing
//!
//! Routes are exact `(method, path)` pairs. The path is the request target
//! without the query string (which is only split off for `GET`); no
//! normalization, no wildcards.
//!
//! # Examples
//!
//! ```no_run
//! use dual_web::{Method, Request, Response, Server, StatusCode, TlsConfig, TlsVersion};
//! use std::net::Ipv4Addr;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(Ipv4Addr::UNSPECIFIED.into(), 8443);
//!
//!     server
//!         .set_tls_config(TlsConfig::from_pem_files("cert.pem", "key.pem", TlsVersion::Tls12)?)
//!         .set_redirect_to_https(true)
//!         .register(Method::Get, "/hello", |req: &Request, log_info: &str| {
//!             let name = req.query_parameter("name").unwrap_or("World");
//!             println!("{log_info}: hello {name}");
//!
//!             let mut resp = Response::with_status(StatusCode::Ok);
//!             resp.add_header("Content-Type", "text/plain")
//!                 .set_body(format!("Hello {name}!"));
//!             resp
//!         });
//!
//!     server.launch().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Limitations
//!
//! - One request per connection, always closed afterwards
//! - The request must arrive in a single read; no `Content-Length` or
//!   chunked body handling
//! - No read or handshake timeouts
//! - Handlers are synchronous and run on the connection task

pub(crate) mod http {
    pub mod query;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod redirect;
    pub(crate) mod router;
    pub(crate) mod server_impl;
    pub(crate) mod sniff;
    pub(crate) mod stream;
    pub(crate) mod tls;
}
pub(crate) mod errors;
pub mod limits;

pub use crate::{
    http::{
        query,
        request::Request,
        response::{Response, WriteBuffer, SERVER_NAME},
        types::{Case, HeaderMap, Method, StatusCode},
    },
    server::{
        router::Handler,
        server_impl::Server,
        tls::{TlsConfig, TlsError, TlsVersion},
    },
};

#[cfg(test)]
pub mod tools {
    use std::str::from_utf8;

    #[inline]
    pub fn str_op(value: &[u8]) -> &str {
        from_utf8(value).unwrap()
    }

    #[inline]
    pub fn pairs(params: &[(String, String)]) -> Vec<(&str, &str)> {
        params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}
