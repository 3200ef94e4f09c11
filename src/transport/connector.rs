//! BoringSSL TLS connector with a swappable ClientHello profile.

use boring::ssl::{SslConnector, SslMethod, SslSessionCacheMode, SslVersion};
use boring::x509::X509;
use http::Uri;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::net::TcpStream;
use tokio_boring::SslStream;

use crate::error::{Error, Result};
use crate::fingerprint::{ClientHelloId, TlsFingerprint};
use crate::timeouts::Timeouts;

/// TLS stream produced by a handshake.
pub type TlsStream = SslStream<TcpStream>;

/// Host and port a connection is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    host: String,
    port: u16,
}

impl Target {
    /// Target of an `https` URI; port defaults to 443.
    pub fn from_uri(uri: &Uri) -> Result<Self> {
        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidUri(format!("missing host in {}", uri)))?;
        Ok(Self {
            host: host.to_string(),
            port: uri.port_u16().unwrap_or(443),
        })
    }

    /// Host as written in the URI.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port, explicit or the `https` default.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Name used for SNI and certificate verification (IPv6 brackets removed).
    pub fn server_name(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    /// `host:port` for socket connects.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Negotiated ALPN protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlpnProtocol {
    /// HTTP/2 ("h2")
    H2,
    /// HTTP/1.1 ("http/1.1")
    Http1,
    /// No ALPN negotiated or unknown protocol
    Unknown,
}

impl AlpnProtocol {
    /// Read the protocol selected during the handshake.
    pub fn of(stream: &TlsStream) -> Self {
        match stream.ssl().selected_alpn_protocol() {
            Some(b"h2") => Self::H2,
            Some(b"http/1.1") => Self::Http1,
            _ => Self::Unknown,
        }
    }

    /// Check if HTTP/2 was negotiated.
    pub fn is_h2(&self) -> bool {
        matches!(self, Self::H2)
    }

    /// ALPN identifier, or `none`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H2 => "h2",
            Self::Http1 => "http/1.1",
            Self::Unknown => "none",
        }
    }
}

/// Opens TCP connections and performs fingerprinted TLS handshakes.
///
/// The ClientHello profile can be replaced at any time; it is read once per
/// handshake, so the change applies to the next connection only.
pub struct BoringConnector {
    hello: Mutex<ClientHelloId>,
    timeouts: Timeouts,
    root_certs: Vec<Vec<u8>>,
}

impl BoringConnector {
    /// Create a connector.
    pub fn new(hello: ClientHelloId, timeouts: Timeouts, root_certs: Vec<Vec<u8>>) -> Self {
        Self {
            hello: Mutex::new(hello),
            timeouts,
            root_certs,
        }
    }

    /// Profile used for the next handshake.
    pub fn client_hello(&self) -> ClientHelloId {
        *self.hello.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the profile for future handshakes.
    pub fn set_client_hello(&self, hello: ClientHelloId) {
        *self.hello.lock().unwrap_or_else(PoisonError::into_inner) = hello;
    }

    fn configure_ssl(&self, fp: &TlsFingerprint) -> Result<SslConnector> {
        let mut builder = SslConnector::builder(SslMethod::tls_client())
            .map_err(|e| Error::tls(format!("Failed to create SSL connector: {}", e)))?;

        for cert_bytes in &self.root_certs {
            let cert = X509::from_der(cert_bytes)
                .or_else(|_| X509::from_pem(cert_bytes))
                .map_err(|e| Error::tls(format!("Invalid root certificate: {}", e)))?;
            builder
                .cert_store_mut()
                .add_cert(cert)
                .map_err(|e| Error::tls(format!("Failed to add root certificate: {}", e)))?;
        }

        if !fp.cipher_list.is_empty() {
            builder
                .set_cipher_list(&fp.cipher_list.join(":"))
                .map_err(|e| Error::tls(format!("Failed to set cipher list: {}", e)))?;
        }

        if !fp.curves.is_empty() {
            builder
                .set_curves_list(&fp.curves.join(":"))
                .map_err(|e| Error::tls(format!("Failed to set curves: {}", e)))?;
        }

        if !fp.sigalgs.is_empty() {
            builder
                .set_sigalgs_list(&fp.sigalgs.join(":"))
                .map_err(|e| Error::tls(format!("Failed to set signature algorithms: {}", e)))?;
        }

        // Chrome: GREASE + permutation. Firefox: permutation only.
        builder.set_grease_enabled(fp.grease);
        builder.set_permute_extensions(fp.permute_extensions);

        builder
            .set_min_proto_version(Some(SslVersion::TLS1_2))
            .map_err(|e| Error::tls(format!("Failed to set min TLS version: {}", e)))?;
        builder
            .set_max_proto_version(Some(SslVersion::TLS1_3))
            .map_err(|e| Error::tls(format!("Failed to set max TLS version: {}", e)))?;

        builder.set_session_cache_mode(SslSessionCacheMode::CLIENT);

        if let Some(alpn) = fp.alpn {
            builder
                .set_alpn_protos(alpn)
                .map_err(|e| Error::tls(format!("Failed to set ALPN: {}", e)))?;
        }

        Ok(builder.build())
    }

    /// Connect to `target` and complete a TLS handshake with the current
    /// profile. A failed handshake drops (and so closes) the TCP stream.
    pub async fn connect(&self, target: &Target) -> Result<(TlsStream, AlpnProtocol)> {
        let hello = self.client_hello();
        let fp = hello.resolve(&mut rand::rng());
        let addr = target.addr();

        let tcp = tokio::time::timeout(self.timeouts.connect, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::ConnectTimeout(self.timeouts.connect))?
            .map_err(|e| Error::from_connect(&addr, e))?;
        let _ = tcp.set_nodelay(true);

        let ssl_config = self
            .configure_ssl(&fp)?
            .configure()
            .map_err(|e| Error::tls(format!("Failed to configure SSL: {}", e)))?;

        let stream = tokio::time::timeout(
            self.timeouts.handshake,
            tokio_boring::connect(ssl_config, target.server_name(), tcp),
        )
        .await
        .map_err(|_| Error::HandshakeTimeout(self.timeouts.handshake))?
        .map_err(|e| Error::from_handshake(&addr, &e))?;

        let protocol = AlpnProtocol::of(&stream);
        tracing::debug!(
            peer = %target,
            hello = hello.as_str(),
            randomized = hello.is_randomized(),
            alpn = protocol.as_str(),
            "TLS handshake complete"
        );

        Ok((stream, protocol))
    }
}

impl fmt::Debug for BoringConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoringConnector")
            .field("hello", &self.client_hello())
            .field("timeouts", &self.timeouts)
            .field("root_certs", &self.root_certs.len())
            .finish()
    }
}
