use crate::http::{
    request::Request,
    response::Response,
    types::{Case, StatusCode},
};
use percent_encoding::{utf8_percent_encode, CONTROLS};

/// Builds the answer for a plaintext request when HTTPS redirection is on.
///
/// With a `Host` header the client is sent to the same target over
/// `https://`; the host is copied verbatim, port included. Without one
/// there is nowhere to redirect to and the request gets `400`, as does a
/// host containing control characters. Control characters in the decoded
/// target are percent-encoded again before they reach `Location`.
///
/// Request validity is not checked: even a request with an unknown method
/// is redirected.
pub(crate) fn redirect(request: &Request) -> Response {
    let host = match request.header("Host", Case::Insensitive) {
        Some(host) if !host.chars().any(char::is_control) => host,
        _ => return Response::with_status(StatusCode::BadRequest),
    };

    let target = utf8_percent_encode(request.target_raw(), CONTROLS);
    let location = format!("https://{host}{target}");

    let mut response = Response::with_status(StatusCode::MovedPermanently);
    response
        .add_header("Location", location.as_str())
        .add_header("Content-Type", "text/plain; charset=utf-8")
        .set_body(format!("Moved Permanently to {location}"));

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn location() {
        #[rustfmt::skip]
        let cases = [
            ("GET /test?x=1 HTTP/1.1\r\nHost: example.com\r\n\r\n",      "https://example.com/test?x=1"),
            ("GET / HTTP/1.1\r\nHost: example.com:8080\r\n\r\n",         "https://example.com:8080/"),
            ("POST /form HTTP/1.1\r\nhost: example.com\r\n\r\na=1",      "https://example.com/form"),
            ("GET /a%20b HTTP/1.1\r\nHost: h\r\n\r\n",                   "https://h/a b"),
            ("FOO /x HTTP/1.1\r\nHost: h\r\n\r\n",                       "https://h/x"),
        ];

        for (data, location) in cases {
            let resp = redirect(&Request::parse(data.as_bytes()));

            assert_eq!(resp.status(), StatusCode::MovedPermanently, "{data:?}");
            assert_eq!(resp.header("Location", Case::Sensitive), Some(location));
            assert_eq!(str_op(resp.body()), format!("Moved Permanently to {location}"));
        }
    }

    #[test]
    fn control_bytes_in_target_encoded() {
        #[rustfmt::skip]
        let cases = [
            ("GET /x%0D%0ASet-Cookie:%20pwned=1 HTTP/1.1\r\nHost: h\r\n\r\n", "https://h/x%0D%0ASet-Cookie: pwned=1"),
            ("GET /a%0Db HTTP/1.1\r\nHost: h\r\n\r\n",                        "https://h/a%0Db"),
            ("GET /a%09b HTTP/1.1\r\nHost: h\r\n\r\n",                         "https://h/a%09b"),
        ];

        for (data, location) in cases {
            let mut resp = redirect(&Request::parse(data.as_bytes()));
            assert_eq!(resp.header("Location", Case::Sensitive), Some(location), "{data:?}");

            resp.finalize();
            let encoded = resp.encode();
            let head = str_op(&encoded).split("\r\n\r\n").next().unwrap_or_default();

            assert!(!head.contains("\r\nSet-Cookie"), "{head:?}");
            assert!(head.lines().all(|line| !line.contains('\r')), "{head:?}");
        }
    }

    #[test]
    fn control_bytes_in_host_rejected() {
        let resp = redirect(&Request::parse(b"GET / HTTP/1.1\r\nHost: h\rX-Evil: 1\r\n\r\n"));

        assert_eq!(resp.status(), StatusCode::BadRequest);
        assert_eq!(resp.header("Location", Case::Insensitive), None);
    }

    #[test]
    fn missing_host() {
        let mut resp = redirect(&Request::parse(b"GET /test HTTP/1.1\r\n\r\n"));
        assert_eq!(resp.status(), StatusCode::BadRequest);
        assert_eq!(resp.header("Location", Case::Insensitive), None);

        resp.finalize();
        assert_eq!(str_op(resp.body()), "400 Bad Request");
    }
}
