//! Dispatcher configuration.

use std::sync::Arc;

use crate::disguise::Disguiser;
use crate::dispatch::outcome::{ItemError, SuccessResponse};
use crate::dispatch::runner::{TaskRunner, WorkerPool};
use crate::dispatch::Dispatcher;
use crate::sequence::Sequence;
use crate::transport::{Client, HttpClient};

/// Callback receiving every successful item.
pub type SuccessCallback = Box<dyn FnMut(SuccessResponse) + Send>;

/// Callback receiving every failed item.
pub type ErrorCallback = Box<dyn FnMut(ItemError) + Send>;

/// Parameters of a run. Fixed once the dispatcher is built.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum number of items in flight.
    pub workers: usize,
    /// Number of keys to generate.
    pub iterations: u64,
    /// Absolute index of the first key.
    pub start: u64,
    /// Add decoy browser headers to every request.
    pub disguise: bool,
    pub sequence: Sequence,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            iterations: 1,
            start: 0,
            disguise: true,
            sequence: Sequence::Numeric,
        }
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder<C = Client, R = WorkerPool> {
    config: RunConfig,
    client: C,
    runner: R,
    disguiser: Option<Disguiser>,
    on_success: SuccessCallback,
    on_error: ErrorCallback,
}

impl DispatcherBuilder {
    /// Builder with the default client, runner and logging callbacks.
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            client: Client::default(),
            runner: WorkerPool,
            disguiser: None,
            on_success: Box::new(log_success),
            on_error: Box::new(log_error),
        }
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: HttpClient, R: TaskRunner> DispatcherBuilder<C, R> {
    /// Number of concurrent workers. Zero is treated as one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers.max(1);
        self
    }

    /// Number of keys to process.
    pub fn iterations(mut self, iterations: u64) -> Self {
        self.config.iterations = iterations;
        self
    }

    /// Index of the first key, for resuming an earlier run.
    pub fn start_index(mut self, start: u64) -> Self {
        self.config.start = start;
        self
    }

    /// Enable or disable decoy headers.
    pub fn disguise(mut self, enabled: bool) -> Self {
        self.config.disguise = enabled;
        self
    }

    /// Use a specific decoy header generator, e.g. a seeded one.
    pub fn disguiser(mut self, disguiser: Disguiser) -> Self {
        self.disguiser = Some(disguiser);
        self
    }

    /// Key format for generated items.
    pub fn sequence(mut self, sequence: Sequence) -> Self {
        self.config.sequence = sequence;
        self
    }

    /// Replace the whole run configuration.
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self.config.workers = self.config.workers.max(1);
        self
    }

    /// Send requests through `client` instead of the default [`Client`].
    pub fn client<C2: HttpClient>(self, client: C2) -> DispatcherBuilder<C2, R> {
        DispatcherBuilder {
            config: self.config,
            client,
            runner: self.runner,
            disguiser: self.disguiser,
            on_success: self.on_success,
            on_error: self.on_error,
        }
    }

    /// Schedule items with `runner` instead of the default [`WorkerPool`].
    pub fn runner<R2: TaskRunner>(self, runner: R2) -> DispatcherBuilder<C, R2> {
        DispatcherBuilder {
            config: self.config,
            client: self.client,
            runner,
            disguiser: self.disguiser,
            on_success: self.on_success,
            on_error: self.on_error,
        }
    }

    /// Called once per item that got a response.
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnMut(SuccessResponse) + Send + 'static,
    {
        self.on_success = Box::new(callback);
        self
    }

    /// Called once per item that failed.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnMut(ItemError) + Send + 'static,
    {
        self.on_error = Box::new(callback);
        self
    }

    /// Finish the dispatcher.
    pub fn build(self) -> Dispatcher<C, R> {
        Dispatcher {
            config: self.config,
            client: Arc::new(self.client),
            runner: self.runner,
            disguiser: Arc::new(self.disguiser.unwrap_or_default()),
            on_success: self.on_success,
            on_error: self.on_error,
        }
    }
}

fn log_success(resp: SuccessResponse) {
    tracing::info!(
        key = %resp.key,
        status = resp.status.as_u16(),
        body = %resp.text(),
        "Request succeeded"
    );
}

fn log_error(err: ItemError) {
    tracing::error!(key = %err.key, error = %err.error, "Request failed");
}
