//! Error types for keysweep crate.

use boring::ssl::ErrorCode;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by caller-supplied request builders.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error message fragments that mark a connection as unusable.
const BROKEN_MARKERS: &[&str] = &[
    "connection broken",
    "connection reset",
    "connection refused",
    "broken pipe",
];

/// Errors that can occur while building or dispatching requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request builder rejected a key.
    #[error("Failed to build request: {0}")]
    Build(#[source] BoxError),

    /// URL scheme the client cannot speak.
    #[error("Invalid URL scheme: {0:?}")]
    UnsupportedScheme(String),

    /// Request target could not be turned into an address.
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// The cached connection died underneath a request.
    #[error("Connection broken: {0}")]
    ConnectionBroken(String),

    /// Any other failure while performing the request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// TCP connection setup error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// TCP connect did not finish in time.
    #[error("Connect timeout after {0:?}")]
    ConnectTimeout(Duration),

    /// TLS handshake did not finish in time.
    #[error("TLS handshake timeout after {0:?}")]
    HandshakeTimeout(Duration),

    /// Total request deadline exceeded.
    #[error("Request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// The task processing an item panicked.
    #[error("Task panicked: {0}")]
    Panicked(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a build error.
    pub fn build(source: impl Into<BoxError>) -> Self {
        Self::Build(source.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Whether the connection behind this error should be thrown away and
    /// re-established.
    pub fn is_connection_broken(&self) -> bool {
        match self {
            Self::ConnectionBroken(_) => true,
            Self::Io(e) => is_broken_io_kind(e.kind()),
            Self::Connection(msg) | Self::Transport(msg) => has_broken_marker(msg),
            _ => false,
        }
    }

    /// Whether the request builder produced this error.
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build(_))
    }

    /// Classify a connect-phase IO error.
    pub(crate) fn from_connect(addr: &str, e: io::Error) -> Self {
        if is_broken_io_kind(e.kind()) {
            Self::ConnectionBroken(format!("Failed to connect to {}: {}", addr, e))
        } else {
            Self::Connection(format!("Failed to connect to {}: {}", addr, e))
        }
    }

    /// Classify a failed TLS handshake.
    ///
    /// A peer that resets or closes the socket mid-handshake leaves the
    /// connection broken, not the TLS configuration.
    pub(crate) fn from_handshake<S>(addr: &str, e: &tokio_boring::HandshakeError<S>) -> Self {
        let peer_gone = match e.as_io_error() {
            Some(io_err) => is_broken_io_kind(io_err.kind()),
            None => e.code() == Some(ErrorCode::SYSCALL),
        };
        if peer_gone {
            Self::ConnectionBroken(format!("TLS handshake with {} failed: {}", addr, e))
        } else {
            Self::Tls(format!("TLS handshake with {} failed: {}", addr, e))
        }
    }

    /// Classify an error raised while a request was in flight.
    ///
    /// hyper reports a peer that hung up as closed/canceled/incomplete; those
    /// and reset-style IO errors anywhere in the source chain become
    /// [`Error::ConnectionBroken`].
    pub(crate) fn from_hyper(context: &str, e: hyper::Error) -> Self {
        let broken = e.is_closed() || e.is_canceled() || e.is_incomplete_message();
        if broken || chain_is_broken(&e) {
            Self::ConnectionBroken(format!("{}: {}", context, e))
        } else {
            Self::Transport(format!("{}: {}", context, e))
        }
    }

    /// Classify an error from the plain (non-TLS) pooled client.
    pub(crate) fn from_plain(e: hyper_util::client::legacy::Error) -> Self {
        if chain_is_broken(&e) {
            Self::ConnectionBroken(format!("HTTP request failed: {}", e))
        } else if e.is_connect() {
            Self::Connection(format!("HTTP connect failed: {}", e))
        } else {
            Self::Transport(format!("HTTP request failed: {}", e))
        }
    }
}

fn is_broken_io_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

fn has_broken_marker(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    BROKEN_MARKERS.iter().any(|m| lower.contains(m))
}

/// Walk the source chain looking for a reset/refused IO error or a
/// connection-broken message.
fn chain_is_broken(e: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if is_broken_io_kind(io_err.kind()) {
                return true;
            }
        }
        if has_broken_marker(&err.to_string()) {
            return true;
        }
        current = err.source();
    }
    false
}
