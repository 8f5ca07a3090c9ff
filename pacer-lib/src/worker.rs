use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use log::{debug, warn};
use tokio::time::Instant;

use crate::queue::{SubmissionQueue, WorkItem};
use crate::ratelimit::{Admission, FixedWindow};
use crate::stats::DispatchStats;
use crate::transport::Transport;
use crate::{ErrorKind, Result};

/// Queue of a dispatcher running transport `T`
pub(crate) type Queue<T> =
    SubmissionQueue<WorkItem<<T as Transport>::Request, <T as Transport>::Response>>;

/// The single execution context of a dispatcher.
///
/// Drains the queue in FIFO order, holds each request until the fixed window
/// admits it, runs it through the transport and publishes the outcome.
/// The window is owned exclusively by the worker.
pub(crate) struct Worker<T: Transport> {
    transport: T,
    window: FixedWindow,
    queue: Arc<Queue<T>>,
    stats: Arc<Mutex<DispatchStats>>,
}

impl<T: Transport> Worker<T> {
    pub(crate) fn new(
        transport: T,
        window: FixedWindow,
        queue: Arc<Queue<T>>,
        stats: Arc<Mutex<DispatchStats>>,
    ) -> Self {
        Self {
            transport,
            window,
            queue,
            stats,
        }
    }

    /// Run until the queue is closed and fully drained
    pub(crate) async fn run(mut self) {
        debug!(
            "Dispatch worker started: {} requests per {:?}",
            self.window.limit(),
            self.window.duration()
        );

        let queue = Arc::clone(&self.queue);
        while let Some(WorkItem {
            request,
            completion,
        }) = queue.dequeue().await
        {
            self.admit().await;
            let outcome = self.execute(request).await;
            completion.publish(outcome);
        }

        debug!("Dispatch worker stopped: queue closed and drained");
    }

    /// Wait until the window allows one more request.
    /// The dequeued request is held meanwhile; nothing overtakes it.
    async fn admit(&mut self) {
        if let Admission::Throttled(wait) = self.window.check(Instant::now()) {
            debug!(
                "Rate limit of {} requests reached, waiting {:?} for the next window",
                self.window.limit(),
                wait
            );
            self.update_stats(|stats| stats.record_throttle(wait));
            tokio::time::sleep(wait).await;
            self.window.reset(Instant::now());
        }
    }

    /// Execute a request. Every attempt consumes quota, failed or not.
    async fn execute(&mut self, request: T::Request) -> Result<T::Response> {
        let start = Instant::now();
        let outcome = AssertUnwindSafe(self.transport.execute(request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                warn!("Transport panicked while executing a request: {message}");
                Err(ErrorKind::TransportPanicked(message))
            });
        let request_time = start.elapsed();

        self.window.record();
        self.update_stats(|stats| stats.record_response(outcome.is_ok(), request_time));
        outcome
    }

    fn update_stats(&self, update: impl FnOnce(&mut DispatchStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut stats);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
