//! Per-item outcomes and run summaries.

use bytes::Bytes;
use http::StatusCode;

use crate::error::Error;
use crate::transport::Request;

/// A completed request together with everything captured about it.
#[derive(Debug)]
pub struct SuccessResponse {
    /// Sequence key the request was built for.
    pub key: String,
    pub status: StatusCode,
    /// Fully read response body.
    pub response_body: Bytes,
    /// Body that was sent; empty when the request had none.
    pub request_body: Bytes,
    /// The request as sent, including decoy headers.
    pub request: Request,
    /// Response head with the captured body.
    pub response: http::Response<Bytes>,
}

impl SuccessResponse {
    /// Response body as text, replacing invalid UTF-8.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.response_body)
    }
}

/// Failure of a single item. Never aborts the run.
#[derive(Debug, thiserror::Error)]
#[error("Key {key:?}: {error}")]
pub struct ItemError {
    pub key: String,
    #[source]
    pub error: Error,
}

impl ItemError {
    /// Failure of the item with `key`.
    pub fn new(key: impl Into<String>, error: Error) -> Self {
        Self {
            key: key.into(),
            error,
        }
    }
}

/// Counts from one [`Dispatcher::run`](super::Dispatcher::run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Keys generated for the run.
    pub submitted: usize,
    /// Items delivered to the success callback.
    pub succeeded: usize,
    /// Items delivered to the error callback.
    pub failed: usize,
    /// The token was cancelled before the run drained.
    pub cancelled: bool,
}

impl RunReport {
    /// Items that produced a callback.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Items never started because of cancellation.
    pub fn skipped(&self) -> usize {
        self.submitted.saturating_sub(self.completed())
    }
}
