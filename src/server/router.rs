use crate::{
    http::{request::Request, response::Response, types::StatusCode},
    Method,
};
use std::{collections::HashMap, fmt, sync::Arc};

/// A request handler bound to one route.
///
/// Handlers run synchronously on the connection task, so a slow handler
/// holds up every other connection of a single-threaded runtime.
///
/// `log_info` identifies the connection (peer address and connection id)
/// for the handler's own log lines.
///
/// Any `Fn(&Request, &str) -> Response` closure is a handler.
///
/// # Examples
///
/// Closure
/// ```
/// use dual_web::{Method, Request, Response, Server, StatusCode};
/// use std::net::Ipv4Addr;
///
/// let mut server = Server::new(Ipv4Addr::LOCALHOST.into(), 8080);
///
/// server.register(Method::Get, "/", |_: &Request, _: &str| {
///     let mut resp = Response::with_status(StatusCode::Ok);
///     resp.set_body("Home");
///     resp
/// });
/// ```
/// Struct with shared state
/// ```
/// use dual_web::{Handler, Request, Response, StatusCode};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Counter(AtomicUsize);
///
/// impl Handler for Counter {
///     fn handle(&self, _: &Request, _: &str) -> Response {
///         let count = self.0.fetch_add(1, Ordering::Relaxed) + 1;
///
///         let mut resp = Response::with_status(StatusCode::Ok);
///         resp.set_body(format!("Request #{count}"));
///         resp
///     }
/// }
/// ```
pub trait Handler
where
    Self: Send + Sync + 'static,
{
    /// Builds the response for `request`.
    ///
    /// The returned response is sent as is, apart from the standard headers
    /// and the placeholder body for empty error responses.
    fn handle(&self, request: &Request, log_info: &str) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&Request, &str) -> Response + Send + Sync + 'static,
{
    #[inline]
    fn handle(&self, request: &Request, log_info: &str) -> Response {
        self(request, log_info)
    }
}

/// Route table keyed by method and exact path.
///
/// No normalization happens: `/test`, `/test/` and `/Test` are three
/// different routes. Cloning shares the handlers.
#[derive(Clone, Default)]
pub(crate) struct Router {
    routes: HashMap<(Method, String), Arc<dyn Handler>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.routes.keys().map(|(method, path)| format!("{method} {path}")))
            .finish()
    }
}

impl Router {
    /// Binds `handler` to the route, replacing any previous handler.
    ///
    /// Returns `true` when a handler was replaced.
    #[inline]
    pub(crate) fn register<H: Handler>(&mut self, method: Method, path: String, handler: H) -> bool {
        self.routes.insert((method, path), Arc::new(handler)).is_some()
    }

    /// Returns `true` when the route existed.
    #[inline]
    pub(crate) fn unregister(&mut self, method: Method, path: &str) -> bool {
        self.routes.remove(&(method, path.to_owned())).is_some()
    }

    #[inline]
    pub(crate) fn get(&self, method: Method, path: &str) -> Option<&Arc<dyn Handler>> {
        // Borrowed tuple keys cannot be looked up without an owned String.
        self.routes.get(&(method, path.to_owned()))
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }

    /// Produces the response for a parsed request.
    ///
    /// - invalid request: `400`, no lookup
    /// - no route: `404`
    /// - otherwise the handler's response
    pub(crate) fn dispatch(&self, request: &Request, log_info: &str) -> Response {
        if !request.is_valid() {
            return Response::with_status(StatusCode::BadRequest);
        }

        match self.get(request.method(), request.path()) {
            Some(handler) => handler.handle(request, log_info),
            None => Response::with_status(StatusCode::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::*;

    fn text(status: StatusCode, body: &'static str) -> impl Handler {
        move |_: &Request, _: &str| {
            let mut resp = Response::with_status(status);
            resp.set_body(body);
            resp
        }
    }

    fn router() -> Router {
        let mut router = Router::default();
        router.register(Method::Get, "/".into(), text(StatusCode::Ok, "Home"));
        router.register(Method::Get, "/test".into(), text(StatusCode::Ok, "GET Test OK"));
        router.register(Method::Post, "/test".into(), text(StatusCode::Ok, "POST Test OK"));
        router
    }

    #[test]
    fn dispatch() {
        let router = router();

        #[rustfmt::skip]
        let cases = [
            ("GET / HTTP/1.1\r\n\r\n",           StatusCode::Ok,         "Home"),
            ("GET /test HTTP/1.1\r\n\r\n",       StatusCode::Ok,         "GET Test OK"),
            ("GET /test?a=1 HTTP/1.1\r\n\r\n",   StatusCode::Ok,         "GET Test OK"),
            ("POST /test HTTP/1.1\r\n\r\n{}",    StatusCode::Ok,         "POST Test OK"),

            ("GET /test/ HTTP/1.1\r\n\r\n",      StatusCode::NotFound,   ""),
            ("GET /Test HTTP/1.1\r\n\r\n",       StatusCode::NotFound,   ""),
            ("PUT /test HTTP/1.1\r\n\r\n",       StatusCode::NotFound,   ""),
            ("POST /test?a=1 HTTP/1.1\r\n\r\n",  StatusCode::NotFound,   ""),

            ("BREW /test HTTP/1.1\r\n\r\n",      StatusCode::BadRequest, ""),
            ("GET /test\r\n\r\n",                StatusCode::BadRequest, ""),
            ("GET /test HTTP/1.1\r\nBad\r\n\r\n", StatusCode::BadRequest, ""),
        ];

        for (data, status, body) in cases {
            let resp = router.dispatch(&Request::parse(data.as_bytes()), "test");

            assert_eq!(resp.status(), status, "{data:?}");
            assert_eq!(str_op(resp.body()), body, "{data:?}");
        }
    }

    #[test]
    fn not_found_placeholder() {
        let mut resp = router().dispatch(&Request::parse(b"GET /missing HTTP/1.1\r\n\r\n"), "");
        resp.finalize();

        assert_eq!(resp.status(), StatusCode::NotFound);
        assert_eq!(str_op(resp.body()), "404 Not Found");
    }

    #[test]
    fn handler_status_kept() {
        let mut router = Router::default();
        router.register(Method::Post, "/secret".into(), |_: &Request, _: &str| {
            Response::with_status(StatusCode::Unauthorized)
        });

        let mut resp = router.dispatch(&Request::parse(b"POST /secret HTTP/1.1\r\n\r\n"), "");
        resp.finalize();

        assert_eq!(resp.status(), StatusCode::Unauthorized);
        assert_eq!(str_op(resp.body()), "401 Unauthorized");
    }

    #[test]
    fn handler_gets_request_and_log_info() {
        let mut router = Router::default();
        router.register(Method::Get, "/echo".into(), |req: &Request, log_info: &str| {
            let mut resp = Response::with_status(StatusCode::Ok);
            resp.set_body(format!("{log_info} {}", req.query_parameter("x").unwrap_or("-")));
            resp
        });

        let resp = router.dispatch(&Request::parse(b"GET /echo?x=42 HTTP/1.1\r\n\r\n"), "peer");
        assert_eq!(str_op(resp.body()), "peer 42");
    }

    #[test]
    fn register_overwrites() {
        let mut router = router();

        assert!(router.register(Method::Get, "/".into(), text(StatusCode::Ok, "New home")));
        assert_eq!(router.len(), 3);

        let resp = router.dispatch(&Request::parse(b"GET / HTTP/1.1\r\n\r\n"), "");
        assert_eq!(str_op(resp.body()), "New home");
    }

    #[test]
    fn unregister() {
        let mut router = router();

        assert!(router.unregister(Method::Get, "/test"));
        assert!(!router.unregister(Method::Get, "/test"));
        assert!(router.get(Method::Post, "/test").is_some());

        let resp = router.dispatch(&Request::parse(b"GET /test HTTP/1.1\r\n\r\n"), "");
        assert_eq!(resp.status(), StatusCode::NotFound);
    }
}
