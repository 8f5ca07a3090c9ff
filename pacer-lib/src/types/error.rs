use thiserror::Error;

/// Possible errors when dispatching requests with `pacer_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Network error while executing an HTTP request via reqwest
    #[error("Network error while executing request: {0}")]
    NetworkRequest(#[source] reqwest::Error),

    /// Failure reported by a custom [`crate::Transport`]
    #[error("Transport failed to execute request: {0}")]
    Transport(String),

    /// The transport panicked while executing a request.
    /// The worker survives this and keeps serving the queue.
    #[error("Transport panicked while executing request: {0}")]
    TransportPanicked(String),

    /// The request limit per window must be at least one
    #[error("Invalid rate limit: at least one request per window must be allowed")]
    InvalidLimit,

    /// The rate limit window must not be empty
    #[error("Invalid rate limit window: the window duration must not be zero")]
    InvalidWindow,

    /// A request was submitted after the dispatcher stopped accepting work
    #[error("Dispatcher is shut down and no longer accepts requests")]
    AlreadyShutdown,

    /// The completion slot was dropped before a result was published.
    /// This only happens when the runtime driving the worker goes away.
    #[error("Dispatch worker went away before publishing a result")]
    WorkerGone,

    /// Dispatchers spawn their worker onto the current tokio runtime,
    /// so they can only be created from within one
    #[error("A dispatcher must be created from within a tokio runtime: {0}")]
    MissingRuntime(#[source] tokio::runtime::TryCurrentError),

    /// The worker task could not be joined during shutdown
    #[error("Failed to join dispatch worker: {0}")]
    WorkerJoin(#[source] tokio::task::JoinError),

    /// The underlying HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    BuildClient(#[source] reqwest::Error),

    /// A default header could not be parsed.
    #[error("Header could not be parsed: {0}")]
    InvalidHeader(String),
}

impl ErrorKind {
    /// Returns `true` if the error was produced while executing a request,
    /// as opposed to an error of the dispatcher itself
    #[must_use]
    pub const fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::NetworkRequest(_) | Self::Transport(_) | Self::TransportPanicked(_)
        )
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NetworkRequest(e1), Self::NetworkRequest(e2))
            | (Self::BuildClient(e1), Self::BuildClient(e2)) => e1.to_string() == e2.to_string(),
            (Self::Transport(s1), Self::Transport(s2))
            | (Self::TransportPanicked(s1), Self::TransportPanicked(s2))
            | (Self::InvalidHeader(s1), Self::InvalidHeader(s2)) => s1 == s2,
            (Self::WorkerJoin(e1), Self::WorkerJoin(e2)) => e1.to_string() == e2.to_string(),
            (Self::MissingRuntime(e1), Self::MissingRuntime(e2)) => e1.to_string() == e2.to_string(),
            (Self::InvalidLimit, Self::InvalidLimit)
            | (Self::InvalidWindow, Self::InvalidWindow)
            | (Self::AlreadyShutdown, Self::AlreadyShutdown)
            | (Self::WorkerGone, Self::WorkerGone) => true,
            _ => false,
        }
    }
}

impl From<http::header::InvalidHeaderName> for ErrorKind {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for ErrorKind {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}
