use std::{error, fmt, io};

/// Reasons a connection ends without a normal response.
#[derive(Debug, PartialEq)]
pub(crate) enum ErrorKind {
    /// The TLS handshake failed.
    Handshake(IoError),
    /// A TLS handshake arrived but no certificate is configured.
    TlsNotConfigured,
    /// Plaintext arrived while both plaintext modes are disabled.
    PlaintextDisabled,
    /// The peer closed the socket before sending anything.
    Closed,

    Io(IoError),
}

impl ErrorKind {
    #[inline]
    pub(crate) fn handshake(err: io::Error) -> Self {
        ErrorKind::Handshake(IoError(err))
    }

    /// Whether the failure points at server configuration rather than
    /// the peer or the network.
    #[inline]
    pub(crate) const fn is_config(&self) -> bool {
        matches!(self, ErrorKind::TlsNotConfigured | ErrorKind::PlaintextDisabled)
    }
}

impl error::Error for ErrorKind {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ErrorKind::Handshake(err) | ErrorKind::Io(err) => Some(&err.0),
            _ => None,
        }
    }
}
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Handshake(err) => write!(f, "TLS handshake failed: {}", err.0),
            ErrorKind::TlsNotConfigured => f.write_str("TLS handshake received but TLS is not configured"),
            ErrorKind::PlaintextDisabled => f.write_str("plaintext request received but plaintext serving is disabled"),
            ErrorKind::Closed => f.write_str("connection closed by peer"),
            ErrorKind::Io(err) => write!(f, "I/O error: {}", err.0),
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(IoError(err))
    }
}

#[derive(Debug)]
pub(crate) struct IoError(pub(crate) io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        #[rustfmt::skip]
        let cases = [
            (ErrorKind::TlsNotConfigured,  "TLS handshake received but TLS is not configured"),
            (ErrorKind::PlaintextDisabled, "plaintext request received but plaintext serving is disabled"),
            (ErrorKind::Closed,            "connection closed by peer"),
            (
                ErrorKind::handshake(io::Error::new(io::ErrorKind::InvalidData, "bad record")),
                "TLS handshake failed: bad record",
            ),
            (
                io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into(),
                "I/O error: pipe",
            ),
        ];

        for (err, text) in cases {
            assert_eq!(err.to_string(), text);
        }
    }

    #[test]
    fn io_compare_by_kind() {
        let a: ErrorKind = io::Error::new(io::ErrorKind::ConnectionReset, "a").into();
        let b: ErrorKind = io::Error::new(io::ErrorKind::ConnectionReset, "b").into();
        let c: ErrorKind = io::Error::new(io::ErrorKind::TimedOut, "a").into();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn config_errors() {
        assert!(ErrorKind::TlsNotConfigured.is_config());
        assert!(ErrorKind::PlaintextDisabled.is_config());
        assert!(!ErrorKind::Closed.is_config());
        assert!(!ErrorKind::from(io::Error::from(io::ErrorKind::Other)).is_config());
    }
}
