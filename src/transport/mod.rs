//! HTTP transport implementations.
//!
//! - TLS handshakes with a chosen ClientHello via tokio-boring
//! - HTTP/1.1 and HTTP/2 via hyper over the handshaken stream
//! - plain `http` via hyper-util's pooled client

pub mod client;
pub mod connector;
mod h1;

use bytes::Bytes;
use std::future::Future;

use crate::error::Result;
use crate::response::Response;

pub use client::{Client, ClientBuilder};
pub use connector::{AlpnProtocol, BoringConnector, Target};

/// Buffered request; the body is cheap to clone and so always replayable.
pub type Request = http::Request<Bytes>;

/// Anything that can perform a request for the dispatcher.
///
/// [`Client`] is the default implementation. A browser-driven client that
/// only supports `GET` can be dropped in by implementing this trait.
pub trait HttpClient: Send + Sync + 'static {
    /// Perform `request` and return the response with an unread body.
    fn execute(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}
