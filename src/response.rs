//! Response body type shared by every client.

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};

use crate::error::{Error, Result};

/// Streaming response body; drained by the dispatcher.
pub type ResponseBody = BoxBody<Bytes, Error>;

/// Response returned by an [`HttpClient`](crate::transport::HttpClient).
pub type Response = http::Response<ResponseBody>;

/// Body that yields `bytes` in one frame.
pub fn full(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Body with no data.
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

/// Wrap a hyper body, classifying read failures like request failures.
pub(crate) fn from_incoming(body: hyper::body::Incoming) -> ResponseBody {
    body.map_err(|e| Error::from_hyper("Failed to read body", e))
        .boxed()
}

/// Read the whole body into memory.
pub async fn collect(body: ResponseBody) -> Result<Bytes> {
    Ok(body.collect().await?.to_bytes())
}
