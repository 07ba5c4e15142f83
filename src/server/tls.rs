//! TLS server configuration.

use std::{
    error, fmt,
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio_rustls::{
    rustls::{
        self,
        crypto::ring,
        pki_types::{CertificateDer, PrivateKeyDer},
        version::{TLS12, TLS13},
        ServerConfig, SupportedProtocolVersion,
    },
    TlsAcceptor,
};

/// Lowest TLS protocol version a client may negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsVersion {
    /// TLS 1.2 and 1.3
    #[default]
    Tls12,
    /// TLS 1.3 only
    Tls13,
}

static TLS12_AND_UP: &[&SupportedProtocolVersion] = &[&TLS13, &TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&TLS13];

impl TlsVersion {
    #[inline]
    fn versions(self) -> &'static [&'static SupportedProtocolVersion] {
        match self {
            TlsVersion::Tls12 => TLS12_AND_UP,
            TlsVersion::Tls13 => TLS13_ONLY,
        }
    }
}

/// Certificate chain, private key and protocol floor, ready to accept
/// handshakes.
///
/// Cloning is cheap; the underlying `rustls` config is shared.
///
/// # Examples
/// ```no_run
/// use dual_web::{Server, TlsConfig, TlsVersion};
/// use std::net::Ipv4Addr;
///
/// let tls = TlsConfig::from_pem_files("cert.pem", "key.pem", TlsVersion::Tls12)?;
///
/// let mut server = Server::new(Ipv4Addr::UNSPECIFIED.into(), 8443);
/// server.set_tls_config(tls);
/// # Ok::<(), dual_web::TlsError>(())
/// ```
#[derive(Clone)]
pub struct TlsConfig {
    acceptor: TlsAcceptor,
    min_version: TlsVersion,
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("min_version", &self.min_version)
            .finish_non_exhaustive()
    }
}

impl TlsConfig {
    /// Builds a config from an already decoded certificate chain and key.
    ///
    /// The first certificate is the server's own, the rest is the chain.
    pub fn new(
        certs: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
        min_version: TlsVersion,
    ) -> Result<Self, TlsError> {
        if certs.is_empty() {
            return Err(TlsError::NoCertificates(None));
        }

        let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_protocol_versions(min_version.versions())?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;

        Ok(Self {
            acceptor: TlsAcceptor::from(Arc::new(config)),
            min_version,
        })
    }

    /// Loads a PEM certificate chain and a PEM private key from disk.
    ///
    /// The key may be PKCS#8, PKCS#1 (RSA) or SEC1 (EC); the first key in
    /// the file is used.
    pub fn from_pem_files<C, K>(cert_path: C, key_path: K, min_version: TlsVersion) -> Result<Self, TlsError>
    where
        C: AsRef<Path>,
        K: AsRef<Path>,
    {
        let cert_path = cert_path.as_ref();
        let key_path = key_path.as_ref();

        let certs = rustls_pemfile::certs(&mut open(cert_path)?)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| TlsError::Io(cert_path.to_owned(), err))?;

        if certs.is_empty() {
            return Err(TlsError::NoCertificates(Some(cert_path.to_owned())));
        }

        let key = rustls_pemfile::private_key(&mut open(key_path)?)
            .map_err(|err| TlsError::Io(key_path.to_owned(), err))?
            .ok_or_else(|| TlsError::NoPrivateKey(key_path.to_owned()))?;

        tracing::debug!(
            cert = %cert_path.display(),
            key = %key_path.display(),
            chain_len = certs.len(),
            "loaded TLS certificate"
        );

        Self::new(certs, key, min_version)
    }

    #[inline(always)]
    pub const fn min_version(&self) -> TlsVersion {
        self.min_version
    }

    #[inline(always)]
    pub(crate) fn acceptor(&self) -> &TlsAcceptor {
        &self.acceptor
    }
}

#[inline]
fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|err| TlsError::Io(path.to_owned(), err))
}

/// Failure to build a [`TlsConfig`].
#[derive(Debug)]
pub enum TlsError {
    /// A PEM file could not be opened or read.
    Io(PathBuf, io::Error),
    /// The certificate chain is empty.
    NoCertificates(Option<PathBuf>),
    /// The key file contains no usable private key.
    NoPrivateKey(PathBuf),
    /// `rustls` rejected the certificate, key or protocol versions.
    Rustls(rustls::Error),
}

impl error::Error for TlsError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            TlsError::Io(_, err) => Some(err),
            TlsError::Rustls(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for TlsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsError::Io(path, err) => write!(f, "failed to read '{}': {}", path.display(), err),
            TlsError::NoCertificates(Some(path)) => {
                write!(f, "'{}' does not contain any certificates", path.display())
            }
            TlsError::NoCertificates(None) => f.write_str("empty certificate chain"),
            TlsError::NoPrivateKey(path) => {
                write!(f, "'{}' does not contain a usable private key", path.display())
            }
            TlsError::Rustls(err) => write!(f, "invalid TLS configuration: {}", err),
        }
    }
}

impl From<rustls::Error> for TlsError {
    fn from(err: rustls::Error) -> Self {
        TlsError::Rustls(err)
    }
}

#[cfg(test)]
pub(crate) mod test_certs {
    use super::ring;
    use std::{path::PathBuf, sync::Arc};
    use tokio_rustls::rustls::{ClientConfig, RootCertStore};

    pub(crate) fn path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test-data")
            .join(name)
    }

    pub(crate) const CA: &str = include_str!("../../test-data/ca.pem");

    /// Client config trusting only the test CA.
    pub(crate) fn client_config() -> Arc<ClientConfig> {
        let mut roots = RootCertStore::empty();
        for cert in rustls_pemfile::certs(&mut CA.as_bytes()) {
            roots.add(cert.unwrap()).unwrap();
        }

        let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Arc::new(config)
    }
}
