//! Core HTTP protocol types and utilities

use std::fmt;

// TEXT

/// Decodes a protocol line into text.
///
/// Valid `UTF-8` is taken as is, anything else is read as Latin-1 so that
/// a stray byte never makes a request line unreadable.
#[inline]
pub(crate) fn decode_text(src: &[u8]) -> String {
    match simdutf8::basic::from_utf8(src) {
        Ok(text) => text.to_owned(),
        Err(_) => src.iter().map(|&byte| byte as char).collect(),
    }
}

/// Drops `CR` and `LF` so a field can never end early on the wire.
#[inline]
fn strip_line_breaks(text: String) -> String {
    match memchr::memchr2(b'\r', b'\n', text.as_bytes()) {
        None => text,
        Some(_) => text.chars().filter(|&ch| ch != '\r' && ch != '\n').collect(),
    }
}

// METHOD

macro_rules! set_methods {
    ($( $(#[$docs:meta])+ $name:ident = $str:literal; )+) => {
        /// HTTP request methods
        ///
        /// Names map to variants through one fixed table in both directions.
        /// Anything not in the table becomes [`Method::Unknown`].
        ///
        /// # References
        ///
        /// - [RFC 9110, Section 9](https://datatracker.ietf.org/doc/html/rfc9110#section-9)
        /// - [RFC 5789](https://datatracker.ietf.org/doc/html/rfc5789) (PATCH method)
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum Method {
            $( $(#[$docs])+ $name, )+
            /// Any method name not listed above
            Unknown,
        }

        impl Method {
            const TABLE: &'static [(Method, &'static str)] = &[ $( (Method::$name, $str), )+ ];

            /// Looks up a method by its exact (case-sensitive) name.
            #[inline]
            pub fn from_name(name: &str) -> Self {
                Self::TABLE
                    .iter()
                    .find(|(_, text)| *text == name)
                    .map(|(method, _)| *method)
                    .unwrap_or(Method::Unknown)
            }

            /// Returns the wire name, or `""` for [`Method::Unknown`].
            #[inline]
            pub fn as_str(&self) -> &'static str {
                Self::TABLE
                    .iter()
                    .find(|(method, _)| method == self)
                    .map(|(_, text)| *text)
                    .unwrap_or("")
            }
        }
    };
}

set_methods! {
    /// [[RFC9110, Section 9.3.1](https://datatracker.ietf.org/doc/html/rfc9110#section-9.3.1)]
    Get = "GET";
    /// [[RFC9110, Section 9.3.2](https://datatracker.ietf.org/doc/html/rfc9110#section-9.3.2)]
    Head = "HEAD";
    /// [[RFC9110, Section 9.3.3](https://datatracker.ietf.org/doc/html/rfc9110#section-9.3.3)]
    Post = "POST";
    /// [[RFC9110, Section 9.3.4](https://datatracker.ietf.org/doc/html/rfc9110#section-9.3.4)]
    Put = "PUT";
    /// [[RFC9110, Section 9.3.5](https://datatracker.ietf.org/doc/html/rfc9110#section-9.3.5)]
    Delete = "DELETE";
    /// [[RFC9110, Section 9.3.6](https://datatracker.ietf.org/doc/html/rfc9110#section-9.3.6)]
    Connect = "CONNECT";
    /// [[RFC9110, Section 9.3.7](https://datatracker.ietf.org/doc/html/rfc9110#section-9.3.7)]
    Options = "OPTIONS";
    /// [[RFC9110, Section 9.3.8](https://datatracker.ietf.org/doc/html/rfc9110#section-9.3.8)]
    Trace = "TRACE";
    /// [[RFC5789, Section 2](https://datatracker.ietf.org/doc/html/rfc5789#section-2)]
    Patch = "PATCH";
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Unknown => f.write_str("UNKNOWN"),
            method => f.write_str(method.as_str()),
        }
    }
}

// STATUS_CODE

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:expr, $str:expr);
    )+) => {
        /// HTTP status codes understood by the server
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])+
            $name = $num,
        )+ }

        impl StatusCode {
            /// Returns the numeric code.
            #[inline]
            pub const fn as_u16(&self) -> u16 {
                *self as u16
            }

            /// Returns the reason phrase from the fixed status table.
            #[inline]
            pub const fn reason(&self) -> &'static str {
                match self { $( StatusCode::$name => $str, )+ }
            }

            /// Maps a numeric code back to a variant.
            #[inline]
            pub const fn from_u16(code: u16) -> Option<Self> {
                match code {
                    $( $num => Some(StatusCode::$name), )+
                    _ => None,
                }
            }
        }
    }
}

set_status_codes! {
    /// [[RFC9110, Section 15.3.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.1)]
    Ok = (200, "OK");

    /// [[RFC9110, Section 15.4.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.4.2)]
    MovedPermanently = (301, "Moved Permanently");

    /// [[RFC9110, Section 15.5.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.1)]
    BadRequest = (400, "Bad Request");
    /// [[RFC9110, Section 15.5.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.2)]
    Unauthorized = (401, "Unauthorized");
    /// [[RFC9110, Section 15.5.4](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.4)]
    Forbidden = (403, "Forbidden");
    /// [[RFC9110, Section 15.5.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.5)]
    NotFound = (404, "Not Found");
    /// [[RFC9110, Section 15.5.6](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.6)]
    MethodNotAllowed = (405, "Method Not Allowed");

    /// [[RFC9110, Section 15.6.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.1)]
    InternalServerError = (500, "Internal Server Error");
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}

// HEADER MAP

/// Case sensitivity of a header name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Case {
    /// Names must match byte for byte.
    #[default]
    Sensitive,
    /// ASCII case is ignored (per [RFC 9110](https://datatracker.ietf.org/doc/html/rfc9110#section-5.1)).
    Insensitive,
}

impl Case {
    #[inline(always)]
    fn matches(self, name: &str, key: &str) -> bool {
        match self {
            Case::Sensitive => name == key,
            Case::Insensitive => name.eq_ignore_ascii_case(key),
        }
    }
}

/// Ordered multimap of header fields.
///
/// Duplicate names are kept in insertion order, which is also the order
/// they are written to the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderMap {
    pub(crate) headers: Vec<(String, String)>,
}

impl HeaderMap {
    #[inline]
    pub(crate) fn new() -> Self {
        Self { headers: Vec::new() }
    }

    /// Returns the first value stored under `name`.
    #[inline]
    pub fn get(&self, name: &str, case: Case) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| case.matches(name, key))
            .map(|(_, value)| value.as_str())
    }

    /// Returns every value stored under `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str, case: Case) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| case.matches(name, key))
            .map(|(_, value)| value.as_str())
    }

    #[inline]
    pub fn contains(&self, name: &str, case: Case) -> bool {
        self.get(name, case).is_some()
    }

    /// Appends a field, keeping any existing ones with the same name.
    ///
    /// Line breaks in the name or value are removed.
    #[inline]
    pub(crate) fn insert(&mut self, name: String, value: String) {
        self.headers
            .push((strip_line_breaks(name), strip_line_breaks(value)));
    }

    /// Replaces the value of the first field named exactly `name` and
    /// drops the others, or appends the field if there is none.
    ///
    /// Line breaks in the name or value are removed.
    pub(crate) fn set(&mut self, name: &str, value: String) {
        let name = strip_line_breaks(name.to_owned());
        let name = name.as_str();
        let value = strip_line_breaks(value);
        let mut found = false;

        self.headers.retain_mut(|(key, current)| {
            if key.as_str() != name {
                return true;
            }
            if found {
                return false;
            }

            found = true;
            *current = value.clone();
            true
        });

        if !found {
            self.headers.push((name.to_owned(), value));
        }
    }

    /// Removes all fields matching `name`.
    #[inline]
    pub(crate) fn remove(&mut self, name: &str, case: Case) {
        self.headers.retain(|(key, _)| !case.matches(name, key));
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_table() {
        #[rustfmt::skip]
        let cases = [
            ("GET",     Method::Get),
            ("HEAD",    Method::Head),
            ("POST",    Method::Post),
            ("PUT",     Method::Put),
            ("DELETE",  Method::Delete),
            ("CONNECT", Method::Connect),
            ("OPTIONS", Method::Options),
            ("TRACE",   Method::Trace),
            ("PATCH",   Method::Patch),

            ("get",     Method::Unknown),
            ("FOO",     Method::Unknown),
            ("",        Method::Unknown),
            (" GET",    Method::Unknown),
        ];

        for (name, expected) in cases {
            let method = Method::from_name(name);
            assert_eq!(method, expected, "{name:?}");

            if method != Method::Unknown {
                assert_eq!(method.as_str(), name);
            }
        }

        assert_eq!(Method::Unknown.as_str(), "");
        assert_eq!(Method::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn status_table() {
        #[rustfmt::skip]
        let cases = [
            (200, "OK"),
            (301, "Moved Permanently"),
            (400, "Bad Request"),
            (401, "Unauthorized"),
            (403, "Forbidden"),
            (404, "Not Found"),
            (405, "Method Not Allowed"),
            (500, "Internal Server Error"),
        ];

        for (code, reason) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(status.as_u16(), code);
            assert_eq!(status.reason(), reason);
        }

        assert_eq!(StatusCode::from_u16(418), None);
        assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
    }

    #[test]
    fn header_lookup_case() {
        let mut map = HeaderMap::new();
        map.insert("Host".into(), "example.com".into());
        map.insert("X-Tag".into(), "a".into());
        map.insert("x-tag".into(), "b".into());

        assert_eq!(map.get("Host", Case::Sensitive), Some("example.com"));
        assert_eq!(map.get("host", Case::Sensitive), None);
        assert_eq!(map.get("host", Case::Insensitive), Some("example.com"));

        let tags: Vec<_> = map.get_all("X-TAG", Case::Insensitive).collect();
        assert_eq!(tags, ["a", "b"]);
        let tags: Vec<_> = map.get_all("x-tag", Case::Sensitive).collect();
        assert_eq!(tags, ["b"]);
    }

    #[test]
    fn header_set_replaces() {
        let mut map = HeaderMap::new();
        map.insert("A".into(), "1".into());
        map.insert("B".into(), "2".into());
        map.insert("A".into(), "3".into());

        map.set("A", "4".into());
        let all: Vec<_> = map.iter().collect();
        assert_eq!(all, [("A", "4"), ("B", "2")]);

        map.set("C", "5".into());
        assert_eq!(map.get("C", Case::Sensitive), Some("5"));

        map.remove("a", Case::Sensitive);
        assert_eq!(map.len(), 3);
        map.remove("a", Case::Insensitive);
        assert_eq!(map.len(), 2);
        assert!(!map.contains("A", Case::Sensitive));
    }

    #[test]
    fn line_breaks_stripped() {
        #[rustfmt::skip]
        let cases = [
            (("X-A", "plain"),                    ("X-A", "plain")),
            (("X-A", "a\r\nSet-Cookie: b=1"),      ("X-A", "aSet-Cookie: b=1")),
            (("X-A", "bare\rcr"),                 ("X-A", "barecr")),
            (("X-\nA", "lf\n"),                   ("X-A", "lf")),
        ];

        for ((name, value), expected) in cases {
            let mut map = HeaderMap::new();
            map.insert(name.to_owned(), value.to_owned());
            assert_eq!(map.iter().collect::<Vec<_>>(), [expected], "{value:?}");

            map.set(name, "x".to_owned());
            map.set(name, value.to_owned());
            assert_eq!(map.iter().collect::<Vec<_>>(), [expected], "{value:?}");
        }
    }

    #[test]
    fn text_fallback() {
        assert_eq!(decode_text(b"/caf\xc3\xa9"), "/café");
        assert_eq!(decode_text(b"/caf\xe9"), "/café");
    }
}
