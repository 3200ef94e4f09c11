//! Timeout configuration for the fingerprint client.
//!
//! Connection setup fails fast so unresponsive hosts do not tie up workers.
//! Once a connection exists, no request deadline is imposed unless one is
//! configured explicitly.
//!
//! ```rust,ignore
//! use keysweep::{Client, Timeouts};
//! use std::time::Duration;
//!
//! let client = Client::builder()
//!     .timeouts(Timeouts::default().request(Duration::from_secs(10)))
//!     .build();
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default TLS handshake timeout.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Timeout configuration.
///
/// - **connect**: TCP connect. Does NOT cover the TLS handshake.
/// - **handshake**: TLS handshake on an already connected socket.
/// - **request**: Absolute deadline for sending a request and receiving the
///   response head. `None` leaves it to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub handshake: Duration,
    pub request: Option<Duration>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            handshake: DEFAULT_HANDSHAKE_TIMEOUT,
            request: None,
        }
    }
}

impl Timeouts {
    /// Set connect timeout.
    pub fn connect(mut self, timeout: Duration) -> Self {
        self.connect = timeout;
        self
    }

    /// Set TLS handshake timeout.
    pub fn handshake(mut self, timeout: Duration) -> Self {
        self.handshake = timeout;
        self
    }

    /// Set request deadline.
    pub fn request(mut self, timeout: Duration) -> Self {
        self.request = Some(timeout);
        self
    }

    /// Disable request deadline.
    pub fn no_request_timeout(mut self) -> Self {
        self.request = None;
        self
    }
}

/// Run `fut` under an optional deadline, mapping expiry to
/// [`Error::RequestTimeout`].
pub(crate) async fn with_request_deadline<T, F>(deadline: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .map_err(|_| Error::RequestTimeout(d))?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fail_fast() {
        let t = Timeouts::default();
        assert_eq!(t.connect, Duration::from_secs(1));
        assert_eq!(t.handshake, Duration::from_secs(1));
        assert_eq!(t.request, None);
    }

    #[test]
    fn test_builder_pattern() {
        let t = Timeouts::default()
            .connect(Duration::from_millis(250))
            .request(Duration::from_secs(10));
        assert_eq!(t.connect, Duration::from_millis(250));
        assert_eq!(t.handshake, DEFAULT_HANDSHAKE_TIMEOUT);
        assert_eq!(t.request, Some(Duration::from_secs(10)));
        assert_eq!(t.no_request_timeout().request, None);
    }

    #[tokio::test]
    async fn test_request_deadline_expires() {
        let result: Result<()> = with_request_deadline(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::RequestTimeout(_))));
    }

    #[tokio::test]
    async fn test_no_deadline_passes_through() {
        let result = with_request_deadline(None, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
