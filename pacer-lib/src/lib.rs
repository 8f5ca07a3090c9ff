//! `pacer` dispatches outbound requests under a fixed-window rate limit.
//!
//! Requests are queued without blocking and executed one after another, in
//! submission order, by a background worker. No more than `limit` requests
//! are started within any window; the rest wait for the next one.
//!
//! ```no_run
//! use std::time::Duration;
//! use pacer_lib::{Dispatcher, ErrorKind, HttpConfig, HttpTransport, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let transport = HttpTransport::from_config(&HttpConfig::default())?;
//!   let dispatcher = Dispatcher::with_limits(Duration::from_secs(60), 10, transport.clone())?;
//!
//!   let mut handles = Vec::new();
//!   for _ in 0..20 {
//!     let request = transport
//!       .request(http::Method::GET, "https://example.com")
//!       .build()
//!       .map_err(ErrorKind::NetworkRequest)?;
//!     handles.push(dispatcher.submit(request)?);
//!   }
//!
//!   for handle in handles {
//!     println!("{}", handle.await?.status());
//!   }
//!   println!("{}", dispatcher.shutdown().await?.summary());
//!   Ok(())
//! }
//! ```
//!
//! Anything implementing [`Transport`] can be paced, not just HTTP.

mod completion;
mod dispatcher;
mod queue;
mod stats;
mod types;
mod worker;

pub mod ratelimit;
pub mod transport;
#[cfg(test)]
pub(crate) mod test_utils;

pub use completion::ResponseHandle;
pub use dispatcher::{Dispatcher, HttpDispatcher};
pub use ratelimit::RateLimitConfig;
pub use stats::{DispatchStats, MAX_REQUEST_TIME_SAMPLES};
pub use transport::{HttpConfig, HttpTransport, Transport};
pub use types::*;
