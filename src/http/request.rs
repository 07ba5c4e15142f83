use crate::{
    http::types::{decode_text, Case, HeaderMap},
    query::Query,
    Method,
};
use memchr::{memchr, memchr_iter};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;

/// A parsed HTTP request.
///
/// Built once per connection from a single buffered read and never changed
/// afterwards. Parsing never fails: anything malformed is reported through
/// [`is_valid`](Request::is_valid) and the server answers it with `400`.
///
/// # Input format
///
/// #### General designations
/// - `SP`: ASCII space (0x20)
/// - Lines end at `LF`; a trailing `CR` is removed by trimming, so both
///   `"\r\n"` and `"\n"` terminated lines are accepted.
///
/// ## First line
/// ```text
/// [METHOD] SP [TARGET] SP [PROTOCOL]
/// ```
/// The line is split on every single space. Fewer than three parts leaves
/// the request empty and invalid. `[METHOD]` is looked up in the
/// [method table](crate::Method), `[TARGET]` is percent-decoded and
/// `[PROTOCOL]` is stored as is (`HTTP/1.1`, `HTTP/1.0`, anything).
///
/// For `GET` only, a target containing `?` is split into the path and the
/// [query parameters](crate::query::Query).
///
/// ## Header
/// ```text
/// [NAME] ":" [VALUE]
/// ```
/// Split on the first colon, both sides trimmed. A line without a colon
/// stops parsing right there and marks the request invalid. A line with an
/// empty name or value is skipped. Duplicate names are kept.
///
/// ## End of headers
/// The first line that is empty after trimming (whitespace-only lines count).
///
/// ## Body
/// Every remaining line, trimmed, joined with `CRLF`. Leading and trailing
/// whitespace inside body lines is therefore lost, and so are blank lines
/// before the first non-empty one.
///
/// **Not supported**: `Content-Length` checks, `Transfer-Encoding: chunked`,
/// multipart bodies and requests split across several reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    target_raw: String,
    path: String,
    query: Vec<(String, String)>,
    protocol: String,

    headers: HeaderMap,
    body: Vec<u8>,

    valid: bool,

    pub(crate) client_addr: Option<SocketAddr>,
}

impl Request {
    #[inline]
    fn empty() -> Self {
        Request {
            method: Method::Unknown,
            target_raw: String::new(),
            path: String::new(),
            query: Vec::new(),
            protocol: String::new(),

            headers: HeaderMap::new(),
            body: Vec::new(),

            valid: false,

            client_addr: None,
        }
    }

    /// Parses a request from raw bytes.
    ///
    /// # Examples
    /// ```
    /// use dual_web::{Method, Request};
    ///
    /// let req = Request::parse(b"GET /a?x=1&y=2 HTTP/1.1\r\nHost: localhost\r\n\r\n");
    ///
    /// assert!(req.is_valid());
    /// assert_eq!(req.method(), Method::Get);
    /// assert_eq!(req.path(), "/a");
    /// assert_eq!(req.target_raw(), "/a?x=1&y=2");
    /// assert_eq!(req.query_parameter("y"), Some("2"));
    /// ```
    pub fn parse(data: &[u8]) -> Self {
        let mut request = Self::empty();
        let mut lines = Lines::new(data);

        let first_line = lines.next().unwrap_or_default();
        if !request.parse_first_line(first_line) {
            return request;
        }

        request.valid = request.method != Method::Unknown;

        if request.parse_headers(&mut lines) {
            request.parse_body(lines);
        }

        request
    }
}

// Public API
impl Request {
    #[inline(always)]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Returns the whole decoded target, query string included.
    #[inline(always)]
    pub fn target_raw(&self) -> &str {
        &self.target_raw
    }

    /// Returns the target without the query string (route key path).
    #[inline(always)]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the protocol token of the request line, e.g. `HTTP/1.1`.
    #[inline(always)]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Returns all query parameters in the order they were sent.
    #[inline(always)]
    pub fn query_parameters(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the first value of the query parameter `key`.
    #[inline]
    pub fn query_parameter(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[inline(always)]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the first value of the header `name`.
    ///
    /// Uses linear search with the requested case sensitivity.
    #[inline]
    pub fn header(&self, name: &str, case: Case) -> Option<&str> {
        self.headers.get(name, case)
    }

    /// Returns the reconstructed body (may be empty).
    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[inline(always)]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns the peer address when the request came from a socket.
    #[inline(always)]
    pub const fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }
}

// Parse first line
impl Request {
    /// Returns `false` when the line has fewer than three parts.
    fn parse_first_line(&mut self, line: &[u8]) -> bool {
        let line = decode_text(line);
        let parts: Vec<&str> = line.split(' ').collect();

        if parts.len() < 3 {
            return false;
        }

        self.method = Method::from_name(parts[0]);
        self.parse_target(parts[1]);
        self.protocol = parts[2].trim().to_owned();

        true
    }

    fn parse_target(&mut self, token: &str) {
        self.target_raw = percent_decode_str(token)
            .decode_utf8_lossy()
            .trim()
            .to_owned();

        let query_start = match self.method {
            Method::Get => memchr(b'?', self.target_raw.as_bytes()),
            _ => None,
        };

        match query_start {
            Some(index) => {
                self.path = self.target_raw[..index].to_owned();
                Query::parse_into(&mut self.query, &self.target_raw[index + 1..]);
            }
            None => self.path = self.target_raw.clone(),
        }
    }
}

// Parse headers
impl Request {
    /// Consumes header lines up to and including the blank terminator.
    ///
    /// Returns `false` if a malformed line aborted parsing.
    fn parse_headers(&mut self, lines: &mut Lines<'_>) -> bool {
        for line in lines {
            let line = line.trim_ascii();
            if line.is_empty() {
                return true;
            }

            let Some(colon) = memchr(b':', line) else {
                self.valid = false;
                return false;
            };

            let name = decode_text(line[..colon].trim_ascii());
            let value = decode_text(line[colon + 1..].trim_ascii());

            if !name.is_empty() && !value.is_empty() {
                self.headers.insert(name, value);
            }
        }

        true
    }
}

// Parse body
impl Request {
    /// Joins the remaining lines with `CRLF`. Blank lines before the first
    /// content are dropped.
    fn parse_body(&mut self, lines: Lines<'_>) {
        for line in lines {
            if !self.body.is_empty() {
                self.body.extend_from_slice(b"\r\n");
            }

            self.body.extend_from_slice(line.trim_ascii());
        }
    }
}

//

/// Iterator over `LF` separated lines, the final (possibly empty) piece
/// after the last `LF` included.
struct Lines<'a> {
    data: &'a [u8],
    breaks: memchr::Memchr<'a>,
    start: usize,
    done: bool,
}

impl<'a> Lines<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Lines {
            data,
            breaks: memchr_iter(b'\n', data),
            start: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.breaks.next() {
            Some(end) => {
                let line = &self.data[self.start..end];
                self.start = end + 1;
                Some(line)
            }
            None => {
                self.done = true;
                Some(&self.data[self.start..])
            }
        }
    }
}
