use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::completion::{self, ResponseHandle};
use crate::queue::{SubmissionQueue, WorkItem};
use crate::ratelimit::{FixedWindow, RateLimitConfig};
use crate::stats::DispatchStats;
use crate::transport::{HttpTransport, Transport};
use crate::worker::{Queue, Worker};
use crate::{ErrorKind, Result};

/// A dispatcher executing [`reqwest::Request`]s
pub type HttpDispatcher = Dispatcher<HttpTransport>;

/// Executes submitted requests one after another on a background worker,
/// never exceeding the configured number of requests per fixed window.
///
/// Submitting never blocks: requests are queued and a [`ResponseHandle`]
/// resolves once the request has actually been executed. Requests run
/// strictly in submission order. When the window's quota is used up, the
/// worker waits for the next window before executing the request at the
/// head of the queue.
///
/// Every accepted request gets exactly one outcome, including across
/// shutdown: [`Dispatcher::shutdown`] (and dropping the dispatcher) stops
/// admission but lets the worker drain everything already queued.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use pacer_lib::{Dispatcher, ErrorKind, HttpConfig, HttpTransport, Result};
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let transport = HttpTransport::from_config(&HttpConfig::default())?;
/// // At most 10 requests per minute
/// let dispatcher = Dispatcher::with_limits(Duration::from_secs(60), 10, transport.clone())?;
///
/// let request = transport
///     .request(http::Method::GET, "https://example.com")
///     .build()
///     .map_err(ErrorKind::NetworkRequest)?;
/// let response = dispatcher.submit(request)?.await?;
/// println!("{}", response.status());
///
/// let stats = dispatcher.shutdown().await?;
/// println!("{}", stats.summary());
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher<T: Transport> {
    queue: Arc<Queue<T>>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<Mutex<DispatchStats>>,
    config: RateLimitConfig,
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher and spawn its worker onto the current tokio runtime
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidWindow`] or [`ErrorKind::InvalidLimit`]
    /// for an unusable configuration, and [`ErrorKind::MissingRuntime`] when
    /// called outside of a tokio runtime.
    pub fn new(config: RateLimitConfig, transport: T) -> Result<Self> {
        let window = FixedWindow::try_from(config)?;
        let runtime = Handle::try_current().map_err(ErrorKind::MissingRuntime)?;

        let queue = Arc::new(SubmissionQueue::new());
        let stats = Arc::new(Mutex::new(DispatchStats::default()));
        let worker = Worker::new(transport, window, Arc::clone(&queue), Arc::clone(&stats));
        let worker = runtime.spawn(worker.run());

        Ok(Self {
            queue,
            worker: Some(worker),
            stats,
            config,
        })
    }

    /// Create a dispatcher allowing `limit` requests per `window`
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::new`].
    pub fn with_limits(window: Duration, limit: usize, transport: T) -> Result<Self> {
        Self::new(RateLimitConfig::new(window, limit), transport)
    }

    /// Queue a request for execution.
    ///
    /// Returns immediately; await the returned handle for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AlreadyShutdown`] once the dispatcher has been
    /// closed. The request is not queued in that case.
    pub fn submit(&self, request: T::Request) -> Result<ResponseHandle<T::Response>> {
        let (completion, handle) = completion::slot();
        self.queue.enqueue(WorkItem {
            request,
            completion,
        })?;
        Ok(handle)
    }

    /// Stop accepting new requests. Already queued requests still run.
    pub fn close(&self) {
        if !self.queue.is_closed() {
            debug!("Closing dispatcher with {} pending requests", self.pending());
        }
        self.queue.close();
    }

    /// Returns `true` once the dispatcher no longer accepts requests
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Number of requests waiting for execution, not counting the one the
    /// worker is currently holding or executing
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Snapshot of the statistics collected so far
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The rate limit this dispatcher enforces
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Stop accepting requests, wait until every queued request has been
    /// executed and its outcome published, and return the final statistics.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::WorkerJoin`] if the worker task could not be
    /// joined, e.g. because its runtime is shutting down.
    pub async fn shutdown(mut self) -> Result<DispatchStats> {
        self.close();
        if let Some(worker) = self.worker.take() {
            worker.await.map_err(ErrorKind::WorkerJoin)?;
        }
        Ok(self.stats())
    }
}

impl<T: Transport> Drop for Dispatcher<T> {
    // The detached worker keeps draining the queue on its own
    fn drop(&mut self) {
        self.queue.close();
    }
}

impl<T: Transport> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
