//! The seam between the dispatcher and whatever actually performs requests.
//!
//! The dispatcher treats requests and responses as opaque: it hands each
//! request to [`Transport::execute`] exactly once and forwards the result to
//! the caller without looking at it. [`HttpTransport`] executes
//! [`reqwest::Request`]s; tests and other protocols plug in their own
//! implementations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

mod client;

pub use client::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, HttpConfig, HttpTransport};

/// Performs one unit of outbound work.
///
/// Implementations are called by a single dispatch worker, one request at a
/// time, so they never observe concurrent calls from the same dispatcher.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opaque request handed over by the caller
    type Request: Send + 'static;
    /// Result of a successfully executed request
    type Response: Send + 'static;

    /// Execute a single request.
    ///
    /// # Errors
    ///
    /// Any error is delivered to the submitter of `request` and counts as a
    /// failed attempt. It never affects other queued requests.
    async fn execute(&self, request: Self::Request) -> Result<Self::Response>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport,
{
    type Request = T::Request;
    type Response = T::Response;

    async fn execute(&self, request: Self::Request) -> Result<Self::Response> {
        T::execute(self, request).await
    }
}
