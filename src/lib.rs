//! # Keysweep
//!
//! Keyed request dispatch with browser-like traffic shaping.
//!
//! Keysweep enumerates a key space, builds one request per key and sends the
//! requests through a bounded worker pool. Requests carry randomized decoy
//! browser headers and travel over a client that performs its own BoringSSL
//! handshake with a configurable ClientHello, detects HTTP/2 vs HTTP/1.1 via
//! ALPN and transparently reconnects when the connection breaks.

// Core modules
pub mod error;
pub mod response;
pub mod sequence;
pub mod timeouts;

// Traffic shaping
pub mod disguise;
pub mod fingerprint;

// Transport layer
pub mod transport;

// Orchestration
pub mod dispatch;

// Re-exports
pub use disguise::{BrowserFamily, Disguiser};
pub use dispatch::{Dispatcher, ItemError, RunConfig, RunReport, SuccessResponse, TaskRunner};
pub use error::{BoxError, Error, Result};
pub use fingerprint::ClientHelloId;
pub use sequence::Sequence;
pub use timeouts::Timeouts;
pub use tokio_util::sync::CancellationToken;
pub use transport::{Client, ClientBuilder, HttpClient, Request};
