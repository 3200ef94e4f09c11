//! Fingerprint-randomizing client with a single cached transport.
//!
//! The client performs its own TLS handshake, looks at the negotiated ALPN
//! protocol and builds the matching transport over the established stream:
//!
//! - `h2`: one multiplexed HTTP/2 connection shared by every caller.
//! - anything else: an HTTP/1.1 pool seeded with the handshake stream.
//!
//! If a request fails because the connection broke, the cached transport is
//! dropped and the request is retried exactly once on a fresh connection.

use bytes::Bytes;
use http::header::HOST;
use http::uri::Scheme;
use http::{HeaderValue, Version};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http2;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as PlainClient;
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::fingerprint::ClientHelloId;
use crate::response::{self, Response};
use crate::timeouts::{with_request_deadline, Timeouts};
use crate::transport::connector::{AlpnProtocol, BoringConnector, Target, TlsStream};
use crate::transport::h1::Http1Pool;
use crate::transport::{HttpClient, Request};

/// Transport built over one established connection.
enum Transport {
    Http2(http2::SendRequest<Full<Bytes>>),
    Http1(Http1Pool),
}

/// A transport together with the target and protocol it was built for.
pub(crate) struct CachedTransport {
    target: Target,
    protocol: AlpnProtocol,
    transport: Transport,
}

impl CachedTransport {
    async fn establish(
        target: Target,
        protocol: AlpnProtocol,
        stream: TlsStream,
        connector: Arc<BoringConnector>,
    ) -> Result<Self> {
        let transport = if protocol.is_h2() {
            let (sender, conn) = http2::Builder::new(TokioExecutor::new())
                .handshake(TokioIo::new(stream))
                .await
                .map_err(|e| Error::from_hyper("HTTP/2 handshake failed", e))?;

            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::debug!("HTTP/2 connection closed: {}", e);
                }
            });

            Transport::Http2(sender)
        } else {
            Transport::Http1(Http1Pool::with_stream(target.clone(), connector, stream).await?)
        };

        Ok(Self {
            target,
            protocol,
            transport,
        })
    }

    /// Whether this transport can still serve `target`.
    fn serves(&self, target: &Target) -> bool {
        if &self.target != target {
            return false;
        }
        match &self.transport {
            Transport::Http2(sender) => !sender.is_closed(),
            Transport::Http1(_) => true,
        }
    }

    async fn send(&self, request: &Request) -> Result<hyper::Response<Incoming>> {
        match &self.transport {
            Transport::Http2(sender) => {
                let mut sender = sender.clone();
                sender
                    .ready()
                    .await
                    .map_err(|e| Error::from_hyper("HTTP/2 connection not ready", e))?;
                sender
                    .send_request(to_hyper(request, Version::HTTP_2, false)?)
                    .await
                    .map_err(|e| Error::from_hyper("HTTP/2 request failed", e))
            }
            Transport::Http1(pool) => pool.send(to_hyper(request, Version::HTTP_11, true)?).await,
        }
    }
}

/// Connection state shared by every clone of a [`Client`].
enum ConnectionState {
    NoConnection,
    Connected(Arc<CachedTransport>),
}

struct Inner {
    connector: Arc<BoringConnector>,
    state: Mutex<ConnectionState>,
    plain: PlainClient<HttpConnector, Full<Bytes>>,
    timeouts: Timeouts,
}

/// HTTP client with ClientHello control and transparent reconnects.
///
/// Cloning is cheap; clones share the cached connection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

/// Builder for creating clients.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    hello: ClientHelloId,
    timeouts: Timeouts,
    root_certs: Vec<Vec<u8>>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Perform `request`.
    ///
    /// `http` requests go through a plain pooled transport. `https` requests
    /// use the cached fingerprinted transport and are retried once on a new
    /// connection if the first attempt finds the connection broken. Other
    /// schemes fail immediately without I/O.
    pub async fn execute(&self, request: &Request) -> Result<Response> {
        let scheme = request.uri().scheme();
        if scheme == Some(&Scheme::HTTP) {
            return self.send_plain(request).await;
        }
        if scheme != Some(&Scheme::HTTPS) {
            return Err(Error::UnsupportedScheme(
                request.uri().scheme_str().unwrap_or_default().to_string(),
            ));
        }

        match self.round_trip(request).await {
            Err(e) if e.is_connection_broken() => {
                tracing::warn!(error = %e, uri = %request.uri(), "Connection broken, retrying on a new connection");
                self.round_trip(request).await
            }
            result => result,
        }
    }

    /// Replace the ClientHello profile. Only connections established after
    /// this call use it.
    pub fn set_client_hello(&self, hello: ClientHelloId) {
        self.inner.connector.set_client_hello(hello);
    }

    /// Profile used for the next handshake.
    pub fn client_hello(&self) -> ClientHelloId {
        self.inner.connector.client_hello()
    }

    /// Drop the cached transport; the next request performs a new handshake.
    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;
        if matches!(*state, ConnectionState::Connected(_)) {
            tracing::debug!("Resetting cached connection");
        }
        *state = ConnectionState::NoConnection;
    }

    /// Protocol negotiated on the cached connection, if any.
    pub async fn protocol(&self) -> Option<AlpnProtocol> {
        match &*self.inner.state.lock().await {
            ConnectionState::Connected(t) => Some(t.protocol),
            ConnectionState::NoConnection => None,
        }
    }

    /// Idle HTTP/1.1 connections parked in the cached transport.
    pub async fn idle_connections(&self) -> usize {
        match &*self.inner.state.lock().await {
            ConnectionState::Connected(t) => match &t.transport {
                Transport::Http1(pool) => pool.idle_count(),
                Transport::Http2(_) => 0,
            },
            ConnectionState::NoConnection => 0,
        }
    }

    async fn round_trip(&self, request: &Request) -> Result<Response> {
        let transport = self.acquire(request).await?;

        let result =
            with_request_deadline(self.inner.timeouts.request, transport.send(request)).await;

        match result {
            Ok(resp) => Ok(resp.map(response::from_incoming)),
            Err(e) => {
                if e.is_connection_broken() {
                    self.discard(&transport).await;
                }
                Err(e)
            }
        }
    }

    /// Return the cached transport for the request's target, establishing
    /// one under the state lock if needed.
    async fn acquire(&self, request: &Request) -> Result<Arc<CachedTransport>> {
        let target = Target::from_uri(request.uri())?;

        let mut state = self.inner.state.lock().await;
        if let ConnectionState::Connected(t) = &*state {
            if t.serves(&target) {
                return Ok(Arc::clone(t));
            }
        }

        let (stream, protocol) = self.inner.connector.connect(&target).await?;
        let transport = Arc::new(
            CachedTransport::establish(
                target,
                protocol,
                stream,
                Arc::clone(&self.inner.connector),
            )
            .await?,
        );

        *state = ConnectionState::Connected(Arc::clone(&transport));
        Ok(transport)
    }

    /// Drop `used` from the cache unless another caller already replaced it.
    async fn discard(&self, used: &Arc<CachedTransport>) {
        let mut state = self.inner.state.lock().await;
        if let ConnectionState::Connected(current) = &*state {
            if Arc::ptr_eq(current, used) {
                tracing::debug!(peer = %used.target, "Discarding broken connection");
                *state = ConnectionState::NoConnection;
            }
        }
    }

    async fn send_plain(&self, request: &Request) -> Result<Response> {
        let hyper_request = to_hyper(request, Version::HTTP_11, false)?;
        let resp = with_request_deadline(self.inner.timeouts.request, async {
            self.inner
                .plain
                .request(hyper_request)
                .await
                .map_err(Error::from_plain)
        })
        .await?;
        Ok(resp.map(response::from_incoming))
    }
}

impl HttpClient for Client {
    fn execute(
        &self,
        request: &Request,
    ) -> impl std::future::Future<Output = Result<Response>> + Send {
        Client::execute(self, request)
    }
}

impl Default for Client {
    fn default() -> Self {
        ClientBuilder::new().build()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("connector", &self.inner.connector)
            .finish()
    }
}

impl ClientBuilder {
    /// Create a new client builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ClientHello profile.
    pub fn client_hello(mut self, hello: ClientHelloId) -> Self {
        self.hello = hello;
        self
    }

    /// Set timeouts.
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Trust an extra root certificate (DER or PEM).
    pub fn add_root_certificate(mut self, cert: impl Into<Vec<u8>>) -> Self {
        self.root_certs.push(cert.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Client {
        let mut http = HttpConnector::new();
        http.set_connect_timeout(Some(self.timeouts.connect));
        http.set_nodelay(true);
        let plain = PlainClient::builder(TokioExecutor::new()).build(http);

        let connector = Arc::new(BoringConnector::new(
            self.hello,
            self.timeouts.clone(),
            self.root_certs,
        ));

        Client {
            inner: Arc::new(Inner {
                connector,
                state: Mutex::new(ConnectionState::NoConnection),
                plain,
                timeouts: self.timeouts,
            }),
        }
    }
}

/// Convert a buffered request into a hyper request.
///
/// HTTP/1.1 connections get an origin-form target plus a `Host` header;
/// HTTP/2 and the pooled plain client take the absolute URI.
fn to_hyper(
    request: &Request,
    version: Version,
    origin_form: bool,
) -> Result<hyper::Request<Full<Bytes>>> {
    let uri = request.uri();
    let mut builder = hyper::Request::builder()
        .method(request.method().clone())
        .version(version);

    builder = if origin_form {
        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        builder.uri(path)
    } else {
        builder.uri(uri.clone())
    };

    let headers = builder
        .headers_mut()
        .ok_or_else(|| Error::InvalidUri(format!("invalid request target {}", uri)))?;
    headers.extend(request.headers().clone());

    if origin_form && !headers.contains_key(HOST) {
        if let Some(authority) = uri.authority() {
            let host = HeaderValue::from_str(authority.as_str())
                .map_err(|e| Error::InvalidUri(format!("invalid host {}: {}", authority, e)))?;
            headers.insert(HOST, host);
        }
    }

    builder
        .body(Full::new(request.body().clone()))
        .map_err(|e| Error::InvalidUri(format!("Failed to build request: {}", e)))
}
