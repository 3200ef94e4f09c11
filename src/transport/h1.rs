//! HTTP/1.1 transport over fingerprinted TLS connections.
//!
//! HTTP/1.1 cannot multiplex, so concurrent requests each need their own
//! connection. The pool starts with the connection from the initial handshake
//! and dials more (with the same connector, hence the current ClientHello
//! profile) whenever every pooled connection is busy. Concurrent workers
//! therefore end up with roughly one connection each.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::transport::connector::{BoringConnector, Target, TlsStream};

/// Connections kept per pool; extras are closed on check-in.
const MAX_IDLE: usize = 64;

/// How long a request waits for a parked connection to finish its previous
/// exchange before dialing a new one.
const READY_GRACE: Duration = Duration::from_millis(100);

type Sender = http1::SendRequest<Full<Bytes>>;

/// Pool of HTTP/1.1 connections to one target.
///
/// Senders are parked as soon as the response head arrives, so a parked
/// sender may still be streaming its previous body.
pub(crate) struct Http1Pool {
    target: Target,
    connector: Arc<BoringConnector>,
    parked: Mutex<Vec<Sender>>,
}

impl Http1Pool {
    /// Build a pool around an already-handshaken stream.
    pub(crate) async fn with_stream(
        target: Target,
        connector: Arc<BoringConnector>,
        stream: TlsStream,
    ) -> Result<Self> {
        let sender = handshake(stream).await?;
        Ok(Self {
            target,
            connector,
            parked: Mutex::new(vec![sender]),
        })
    }

    /// Send a request on a parked connection, dialing a new one if none
    /// becomes ready in time.
    pub(crate) async fn send(
        &self,
        request: hyper::Request<Full<Bytes>>,
    ) -> Result<hyper::Response<Incoming>> {
        let mut sender = match self.checkout() {
            Some(sender) if sender.is_ready() => sender,
            Some(mut sender) => match timeout(READY_GRACE, sender.ready()).await {
                Ok(Ok(())) => sender,
                Ok(Err(_)) => self.dial().await?,
                Err(_) => {
                    self.checkin(sender);
                    self.dial().await?
                }
            },
            None => self.dial().await?,
        };

        sender
            .ready()
            .await
            .map_err(|e| Error::from_hyper("HTTP/1.1 connection not ready", e))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| Error::from_hyper("HTTP/1.1 request failed", e))?;

        self.checkin(sender);
        Ok(response)
    }

    /// Number of connections currently parked.
    pub(crate) fn idle_count(&self) -> usize {
        self.parked.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Take a parked connection, preferring one that is ready now.
    fn checkout(&self) -> Option<Sender> {
        let mut parked = self.parked.lock().unwrap_or_else(PoisonError::into_inner);
        parked.retain(|s| !s.is_closed());
        let pos = parked
            .iter()
            .position(|s| s.is_ready())
            .or_else(|| parked.len().checked_sub(1))?;
        Some(parked.swap_remove(pos))
    }

    fn checkin(&self, sender: Sender) {
        if sender.is_closed() {
            return;
        }
        let mut parked = self.parked.lock().unwrap_or_else(PoisonError::into_inner);
        if parked.len() < MAX_IDLE {
            parked.push(sender);
        }
    }

    async fn dial(&self) -> Result<Sender> {
        let (stream, _) = self.connector.connect(&self.target).await?;
        tracing::debug!(peer = %self.target, "Opened extra HTTP/1.1 connection");
        handshake(stream).await
    }
}

async fn handshake(stream: TlsStream) -> Result<Sender> {
    let (sender, conn) = http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| Error::from_hyper("HTTP/1.1 handshake failed", e))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("HTTP/1.1 connection closed: {}", e);
        }
    });

    Ok(sender)
}
