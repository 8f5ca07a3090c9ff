//! Global fixed-window rate limiting.
//!
//! A single [`FixedWindow`] governs every request of a dispatcher: at most
//! `limit` requests run within one window, and the window resets completely
//! once its duration has elapsed.
//!
//! - [`RateLimitConfig`]: window length and request limit
//! - [`FixedWindow`]: the worker-local window state and admission check
//! - [`Admission`]: the outcome of an admission check

mod config;
mod window;

pub use config::{DEFAULT_LIMIT, DEFAULT_WINDOW, RateLimitConfig};
pub use window::{Admission, FixedWindow};
