//! Thread-safe FIFO of pending work, fed by any number of callers and
//! drained by exactly one dispatch worker.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::completion::Completion;
use crate::{ErrorKind, Result};

/// A request waiting for execution, paired with the slot its outcome goes to
#[derive(Debug)]
pub(crate) struct WorkItem<Req, Resp> {
    pub(crate) request: Req,
    pub(crate) completion: Completion<Resp>,
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Unbounded multi-producer, single-consumer queue.
///
/// The mutex guards the items and the stop flag together, so an item is
/// either accepted before `close` or rejected after it, never lost in
/// between. [`Notify`] plays the role of a condition variable: every
/// insertion and the stop signal wake the single consumer exactly once.
#[derive(Debug)]
pub(crate) struct SubmissionQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Notify,
}

impl<T> SubmissionQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Notify::new(),
        }
    }

    // No user code ever runs while the lock is held
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item to the tail of the queue
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AlreadyShutdown`] once the queue has been closed.
    pub(crate) fn enqueue(&self, item: T) -> Result<()> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(ErrorKind::AlreadyShutdown);
            }
            state.items.push_back(item);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Wait for the next item.
    ///
    /// Returns `None` once the queue is closed *and* empty. Items accepted
    /// before closing are always handed out first.
    pub(crate) async fn dequeue(&self) -> Option<T> {
        loop {
            let notified = self.available.notified();
            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Stop accepting items and wake the consumer so it can drain and exit
    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.available.notify_one();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of items waiting to be dequeued
    pub(crate) fn len(&self) -> usize {
        self.lock().items.len()
    }
}
