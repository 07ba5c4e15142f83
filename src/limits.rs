//! Listener and connection limits
//!
//! Both structs are plain data with public fields; start from `Default`
//! and override what you need.
//!
//! # Examples
//!
//! ```no_run
//! use dual_web::{limits::{ConnLimits, ServerLimits}, Server};
//! use std::net::Ipv4Addr;
//!
//! let mut server = Server::new(Ipv4Addr::LOCALHOST.into(), 8080);
//! server
//!     .set_server_limits(ServerLimits {
//!         backlog: 4096, // Bursty clients
//!         ..ServerLimits::default()
//!     })
//!     .set_conn_limits(ConnLimits {
//!         read_buffer_size: 16 * 1024, // Small requests only
//!         ..ConnLimits::default()
//!     });
//! ```

/// Listening socket settings.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Length of the kernel accept queue passed to `listen(2)` (default: `1024`).
    pub backlog: i32,

    /// Sets `SO_REUSEADDR` on the listening socket (default: `true`).
    ///
    /// Lets a restarted server bind the same port while old connections
    /// are still in `TIME_WAIT`.
    pub reuse_address: bool,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            backlog: 1024,
            reuse_address: true,

            _priv: (),
        }
    }
}

/// Per-connection settings
///
/// A connection carries exactly one request, read with a single call into
/// a buffer of `read_buffer_size` bytes. Whatever does not fit into that
/// read is never seen by the parser, so size the buffer for the largest
/// request you expect.
#[derive(Debug, Clone)]
pub struct ConnLimits {
    /// Size of the buffer for the single request read (default: `64 KiB`,
    /// minimum: `1`).
    pub read_buffer_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ConnLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            read_buffer_size: 64 * 1024,

            _priv: (),
        }
    }
}
