//! Run orchestration.
//!
//! A [`Dispatcher`] maps a key range onto requests: it generates the keys,
//! hands them to a [`TaskRunner`], builds and disguises each request, sends it
//! through an [`HttpClient`] and routes every outcome to exactly one callback.

pub mod builder;
pub mod outcome;
pub mod runner;

pub use builder::{DispatcherBuilder, ErrorCallback, RunConfig, SuccessCallback};
pub use outcome::{ItemError, RunReport, SuccessResponse};
pub use runner::{TaskRunner, WorkerPool};

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::disguise::Disguiser;
use crate::error::{BoxError, Error};
use crate::response;
use crate::transport::{Client, HttpClient, Request};

/// Drives a batch of keyed requests through a client.
pub struct Dispatcher<C = Client, R = WorkerPool> {
    config: RunConfig,
    client: Arc<C>,
    runner: R,
    disguiser: Arc<Disguiser>,
    on_success: SuccessCallback,
    on_error: ErrorCallback,
}

impl Dispatcher {
    /// Builder with default settings.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }
}

impl<C: HttpClient, R: TaskRunner> Dispatcher<C, R> {
    /// Settings the next run uses.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Client the requests are sent through.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Process every key of the configured range.
    ///
    /// `build` turns a key into a request; a builder error fails only that
    /// item. Callbacks run one at a time in the order results arrive, and
    /// each item reaches exactly one of them. Cancelling `cancel` (also from
    /// inside a callback) stops new items from starting; items already in
    /// flight still complete and are delivered.
    pub async fn run<B>(&mut self, cancel: &CancellationToken, build: B) -> RunReport
    where
        B: Fn(&str) -> std::result::Result<Request, BoxError> + Send + Sync + 'static,
    {
        let start = self.config.start;
        let end = start.saturating_add(self.config.iterations);
        let keys = self.config.sequence.generate(start, end);

        let mut report = RunReport {
            submitted: keys.len(),
            ..RunReport::default()
        };

        tracing::info!(
            start,
            end,
            items = report.submitted,
            workers = self.config.workers,
            disguise = self.config.disguise,
            "Starting run"
        );
        let started = Instant::now();

        let client = Arc::clone(&self.client);
        let disguiser = self.config.disguise.then(|| Arc::clone(&self.disguiser));
        let build = Arc::new(build);

        let process = move |key: String| {
            let client = Arc::clone(&client);
            let disguiser = disguiser.clone();
            let build = Arc::clone(&build);
            async move {
                // A panicking builder or client still yields one outcome for its key.
                let task = tokio::spawn({
                    let key = key.clone();
                    async move { process_item(&*client, disguiser.as_deref(), &*build, key).await }
                });
                match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(ItemError::new(key, Error::Panicked(e.to_string()))),
                }
            }
        };

        let mut results = self
            .runner
            .work(cancel.clone(), self.config.workers, keys, process);

        while let Some(outcome) = results.recv().await {
            match outcome {
                Ok(success) => {
                    report.succeeded += 1;
                    (self.on_success)(success);
                }
                Err(failure) => {
                    report.failed += 1;
                    (self.on_error)(failure);
                }
            }
        }

        report.cancelled = cancel.is_cancelled();

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped(),
            cancelled = report.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Run finished"
        );

        report
    }
}

/// Build, disguise and send the request for one key.
async fn process_item<C, B>(
    client: &C,
    disguiser: Option<&Disguiser>,
    build: &B,
    key: String,
) -> Result<SuccessResponse, ItemError>
where
    C: HttpClient,
    B: Fn(&str) -> std::result::Result<Request, BoxError>,
{
    let mut request = match build(&key) {
        Ok(request) => request,
        Err(e) => return Err(ItemError::new(key, Error::build(e))),
    };

    if let Some(disguiser) = disguiser {
        disguiser.disguise(request.headers_mut());
    }

    let resp = match client.execute(&request).await {
        Ok(resp) => resp,
        Err(e) => return Err(ItemError::new(key, e)),
    };

    let (parts, body) = resp.into_parts();
    let response_body = match response::collect(body).await {
        Ok(bytes) => bytes,
        Err(e) => return Err(ItemError::new(key, e)),
    };

    tracing::trace!(key = %key, status = parts.status.as_u16(), "Item complete");

    Ok(SuccessResponse {
        status: parts.status,
        request_body: request.body().clone(),
        response: http::Response::from_parts(parts, response_body.clone()),
        response_body,
        request,
        key,
    })
}
