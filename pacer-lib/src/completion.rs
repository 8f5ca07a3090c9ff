//! Single-assignment result slots connecting the dispatch worker to callers.
//!
//! Each submitted request gets a [`Completion`] (held by the worker) and a
//! [`ResponseHandle`] (returned to the caller). Publishing consumes the
//! [`Completion`], so a slot can be written at most once.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::{ErrorKind, Result};

/// Create a connected pair of completion slot halves
pub(crate) fn slot<R>() -> (Completion<R>, ResponseHandle<R>) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, ResponseHandle { rx })
}

/// Producer half of a completion slot, owned by the dispatch worker
#[derive(Debug)]
pub(crate) struct Completion<R> {
    tx: oneshot::Sender<Result<R>>,
}

impl<R> Completion<R> {
    /// Publish the outcome of the request.
    ///
    /// A caller that dropped its handle simply never observes the outcome.
    pub(crate) fn publish(self, outcome: Result<R>) {
        if self.tx.send(outcome).is_err() {
            log::trace!("Response handle was dropped before the outcome was published");
        }
    }
}

/// Handle to the eventual outcome of a submitted request.
///
/// Await it to get the transport's response once the request has actually
/// been executed. Outside of an async context, use
/// [`ResponseHandle::blocking_wait`].
#[must_use = "the outcome of a request is only observable through its handle"]
#[derive(Debug)]
pub struct ResponseHandle<R> {
    rx: oneshot::Receiver<Result<R>>,
}

impl<R> ResponseHandle<R> {
    /// Block the current thread until the outcome is published.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the request, or
    /// [`ErrorKind::WorkerGone`] if the worker disappeared first.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn blocking_wait(self) -> Result<R> {
        self.rx.blocking_recv().unwrap_or(Err(ErrorKind::WorkerGone))
    }
}

impl<R> Future for ResponseHandle<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ErrorKind::WorkerGone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_published_outcome_resolves_handle() {
        let (completion, handle) = slot();
        completion.publish(Ok(200_u16));
        assert_eq!(handle.await, Ok(200));
    }

    #[tokio::test]
    async fn test_handle_waits_for_publish() {
        let (completion, handle) = slot::<u16>();
        let waiter = tokio::spawn(handle);

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        completion.publish(Err(ErrorKind::Transport("refused".into())));
        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, Err(ErrorKind::Transport("refused".into())));
    }

    #[tokio::test]
    async fn test_dropped_completion_reports_worker_gone() {
        let (completion, handle) = slot::<u16>();
        drop(completion);
        assert_eq!(handle.await, Err(ErrorKind::WorkerGone));
    }

    #[test]
    fn test_blocking_wait() {
        let (completion, handle) = slot();
        let publisher = std::thread::spawn(move || completion.publish(Ok("done")));
        assert_eq!(handle.blocking_wait(), Ok("done"));
        publisher.join().unwrap();
    }

    #[test]
    fn test_publish_without_handle_is_silent() {
        let (completion, handle) = slot();
        drop(handle);
        completion.publish(Ok(1));
    }
}
