//! HTTP response model and its wire encoder.

use crate::http::types::{Case, HeaderMap, StatusCode};
use chrono::Utc;
use std::{borrow::Cow, rc::Rc, sync::Arc};

/// Value of the `Server` header added to every response.
pub const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP response built by a handler.
///
/// Mutable until the server encodes it. The status starts as
/// [`InternalServerError`](StatusCode::InternalServerError), so a handler
/// that forgets to set one answers `500`.
///
/// The body setter owns the `Content-Length` header: it is present exactly
/// when the body is non-empty.
///
/// # Examples
/// ```
/// use dual_web::{Response, StatusCode};
///
/// let mut resp = Response::new();
/// resp.set_status(StatusCode::Ok)
///     .add_header("Content-Type", "text/plain")
///     .set_body("Hello World!");
///
/// assert_eq!(
///     resp.encode(),
///     b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 12\r\n\r\nHello World!",
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for Response {
    #[inline]
    fn default() -> Self {
        Self::with_status(StatusCode::InternalServerError)
    }
}

impl Response {
    /// Protocol token written on the status line of every response.
    pub const PROTOCOL: &'static str = "HTTP/1.0";

    /// Creates an empty `500` response.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty response with the given status.
    #[inline]
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

// Public API
impl Response {
    #[inline(always)]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    #[inline(always)]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn header(&self, name: &str, case: Case) -> Option<&str> {
        self.headers.get(name, case)
    }

    /// Appends a header field, keeping any existing field with the same name.
    ///
    /// `Content-Length` is owned by [`set_body`](Self::set_body); touching it
    /// through any header method leaves it matching the body.
    #[inline]
    pub fn add_header<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) -> &mut Self {
        let name = name.into();
        let length = is_content_length(&name);

        self.headers.insert(name, value.into());
        if length {
            self.sync_content_length();
        }
        self
    }

    /// Sets a header field, replacing every field with exactly this name.
    #[inline]
    pub fn set_header<V: Into<String>>(&mut self, name: &str, value: V) -> &mut Self {
        self.headers.set(name, value.into());
        if is_content_length(name) {
            self.sync_content_length();
        }
        self
    }

    /// Removes every header field matching `name`.
    #[inline]
    pub fn remove_header(&mut self, name: &str, case: Case) -> &mut Self {
        self.headers.remove(name, case);
        if is_content_length(name) {
            self.sync_content_length();
        }
        self
    }

    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replaces the body and keeps `Content-Length` in step with it.
    ///
    /// # Examples
    /// ```
    /// use dual_web::{Case, Response};
    ///
    /// let mut resp = Response::new();
    ///
    /// resp.set_body(r#"{"ok":true}"#);
    /// assert_eq!(resp.header("Content-Length", Case::Sensitive), Some("11"));
    ///
    /// resp.set_body("");
    /// assert_eq!(resp.header("Content-Length", Case::Insensitive), None);
    /// ```
    pub fn set_body<T: WriteBuffer>(&mut self, data: T) -> &mut Self {
        self.body.clear();
        data.write_to(&mut self.body);
        self.sync_content_length();

        self
    }

    fn sync_content_length(&mut self) {
        self.headers.remove("Content-Length", Case::Insensitive);
        if !self.body.is_empty() {
            self.headers
                .insert("Content-Length".to_owned(), self.body.len().to_string());
        }
    }
}

/// Matches the name the way it is stored, line breaks removed.
#[inline]
fn is_content_length(name: &str) -> bool {
    name.bytes()
        .filter(|&byte| byte != b'\r' && byte != b'\n')
        .map(|byte| byte.to_ascii_lowercase())
        .eq(b"content-length".iter().copied())
}

// Encode
impl Response {
    /// Serializes the response into its wire form.
    #[inline]
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buffer);
        buffer
    }

    /// Appends the wire form to `buffer`.
    ///
    /// ```text
    /// HTTP/1.0 SP [CODE] SP [REASON] CRLF
    /// *( [NAME] ":" SP [VALUE] CRLF )
    /// CRLF
    /// [BODY]
    /// ```
    pub fn encode_into(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(Self::PROTOCOL.as_bytes());
        buffer.push(b' ');
        buffer.extend_from_slice(self.status.as_u16().to_string().as_bytes());
        buffer.push(b' ');
        buffer.extend_from_slice(self.status.reason().as_bytes());
        buffer.extend_from_slice(b"\r\n");

        for (name, value) in self.headers.iter() {
            buffer.extend_from_slice(name.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(value.as_bytes());
            buffer.extend_from_slice(b"\r\n");
        }

        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(&self.body);
    }

    #[inline]
    fn encoded_len(&self) -> usize {
        let status_line = Self::PROTOCOL.len() + 5 + self.status.reason().len() + 2;
        let headers: usize = self.headers.iter().map(|(n, v)| n.len() + v.len() + 4).sum();

        status_line + headers + 2 + self.body.len()
    }
}

// Defaults applied by the server before writing
impl Response {
    /// Gives a bodyless error response a short readable body.
    ///
    /// Only non-`200` responses with an empty body are touched.
    pub(crate) fn fill_empty_body(&mut self) {
        if self.status == StatusCode::Ok || !self.body.is_empty() {
            return;
        }

        let text = self.status.to_string();
        self.set_body(text);
        self.set_header("Content-Type", "text/html; charset=utf-8");
    }

    /// Adds the standard headers the handler did not set itself.
    ///
    /// Presence is checked case-insensitively.
    pub(crate) fn apply_default_headers(&mut self) {
        if !self.headers.contains("Date", Case::Insensitive) {
            self.headers.insert("Date".to_owned(), http_date());
        }
        if !self.headers.contains("Server", Case::Insensitive) {
            self.headers.insert("Server".to_owned(), SERVER_NAME.to_owned());
        }
        if !self.headers.contains("Connection", Case::Insensitive) {
            self.headers.insert("Connection".to_owned(), "close".to_owned());
        }
        if self.status == StatusCode::MethodNotAllowed
            && !self.headers.contains("Allow", Case::Insensitive)
        {
            self.headers.insert("Allow".to_owned(), "GET".to_owned());
        }
    }

    /// Runs both default passes.
    #[inline]
    pub(crate) fn finalize(&mut self) {
        self.fill_empty_body();
        self.apply_default_headers();
    }
}

/// Current time in the `Date` header format, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
#[inline]
pub(crate) fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Types that can be written as a response body.
///
/// Implemented for the common string and byte containers.
///
/// # Example
/// ```
/// use dual_web::WriteBuffer;
///
/// struct Json(String);
///
/// impl WriteBuffer for Json {
///     fn write_to(&self, buffer: &mut Vec<u8>) {
///         buffer.extend_from_slice(self.0.as_bytes())
///     }
/// }
/// ```
pub trait WriteBuffer {
    /// Appends the value's bytes to the buffer.
    fn write_to(&self, buffer: &mut Vec<u8>);
}

macro_rules! impl_write_buffer {
    ($conn:expr => $($t:ty),*) => {
        $(impl WriteBuffer for $t {
            #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                let closure = $conn;
                closure(self, buffer);
            }
        })*
    };
}

impl<T: WriteBuffer + ?Sized> WriteBuffer for &T {
    #[inline]
    fn write_to(&self, buffer: &mut Vec<u8>) {
        T::write_to(*self, buffer);
    }
}
impl_write_buffer! {
    |value: &str, buffer: &mut Vec<u8>| {
        buffer.extend_from_slice(value.as_bytes());
    } => str, String, Box<str>, Cow<'_, str>, Arc<str>, Rc<str>
}
impl_write_buffer! {
    |value: &[u8], buffer: &mut Vec<u8>| {
        buffer.extend_from_slice(value);
    } => [u8], Vec<u8>, Box<[u8]>, Cow<'_, [u8]>, Arc<[u8]>, Rc<[u8]>
}
impl<const N: usize> WriteBuffer for [u8; N] {
    #[inline]
    fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(self);
    }
}


#[cfg(test)]
mod body_tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn content_length_follows_body() {
        #[rustfmt::skip]
        let cases: [(&[u8], Option<&str>); 4] = [
            (b"sample body",                    Some("11")),
            (b"{\"debug\": true, \"doc\": false}", Some("29")),
            ("caf\u{e9}".as_bytes(),            Some("5")),
            (b"",                               None),
        ];

        for (body, length) in cases {
            let mut resp = Response::with_status(StatusCode::Ok);
            resp.set_body(body);

            assert_eq!(resp.body(), body);
            assert_eq!(resp.header("Content-Length", Case::Sensitive), length);
        }
    }

    #[test]
    fn body_replaced_not_appended() {
        let mut resp = Response::with_status(StatusCode::Ok);
        resp.set_body("first").set_body(String::from("second!"));

        assert_eq!(str_op(resp.body()), "second!");
        let lengths: Vec<_> = resp.headers().get_all("Content-Length", Case::Insensitive).collect();
        assert_eq!(lengths, ["7"]);
    }

    #[test]
    fn foreign_content_length_dropped() {
        let mut resp = Response::with_status(StatusCode::Ok);
        resp.add_header("content-length", "999").set_body("abc");

        assert_eq!(
            str_op(&resp.encode()),
            "HTTP/1.0 200 OK\r\nContent-Length: 3\r\n\r\nabc"
        );
    }

    #[test]
    fn content_length_kept_after_header_calls() {
        #[rustfmt::skip]
        let cases: [fn(&mut Response); 6] = [
            |resp| { resp.add_header("Content-Length", "999"); },
            |resp| { resp.add_header("content-length", "0"); },
            |resp| { resp.set_header("Content-Length", "1"); },
            |resp| { resp.remove_header("content-length", Case::Insensitive); },
            |resp| { resp.remove_header("Content-Length", Case::Sensitive); },
            |resp| { resp.add_header("Content-\r\nLength", "42"); },
        ];

        for change in cases {
            let mut resp = Response::with_status(StatusCode::Ok);
            resp.set_body("abc");
            change(&mut resp);

            assert_eq!(
                str_op(&resp.encode()),
                "HTTP/1.0 200 OK\r\nContent-Length: 3\r\n\r\nabc"
            );
        }
    }

    #[test]
    fn content_length_absent_without_body() {
        let mut resp = Response::with_status(StatusCode::Ok);
        resp.add_header("Content-Length", "5").set_header("Content-Length", "7");

        assert_eq!(resp.header("Content-Length", Case::Insensitive), None);
        assert_eq!(str_op(&resp.encode()), "HTTP/1.0 200 OK\r\n\r\n");
    }

    #[test]
    fn body_sources() {
        let mut resp = Response::new();

        resp.set_body(vec![b'a', b'b']);
        assert_eq!(resp.body(), b"ab");
        resp.set_body([b'c'; 3]);
        assert_eq!(resp.body(), b"ccc");
        resp.set_body(Cow::Borrowed("d"));
        assert_eq!(resp.body(), b"d");
        resp.set_body(Arc::<str>::from("e"));
        assert_eq!(resp.body(), b"e");
    }
}
