use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ErrorKind, Result};

/// Default number of requests allowed per window
pub const DEFAULT_LIMIT: usize = 10;

/// Default length of a rate limit window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Rate limiting configuration of a dispatcher
///
/// Windows are written as human-readable durations in config files, for
/// example `"30s"`, `"1m"`, `"1h"` or `"1d"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Length of a fixed rate limit window
    #[serde(default = "default_window", with = "humantime_serde")]
    pub window: Duration,

    /// Maximum number of requests executed within one window
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            limit: default_limit(),
        }
    }
}

const fn default_window() -> Duration {
    DEFAULT_WINDOW
}

const fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl RateLimitConfig {
    /// Allow `limit` requests per `window`
    #[must_use]
    pub const fn new(window: Duration, limit: usize) -> Self {
        Self { window, limit }
    }

    /// Create a `RateLimitConfig` from CLI options, using defaults for missing values
    #[must_use]
    pub fn from_options(window: Option<Duration>, limit: Option<usize>) -> Self {
        Self {
            window: window.unwrap_or(DEFAULT_WINDOW),
            limit: limit.unwrap_or(DEFAULT_LIMIT),
        }
    }

    /// Check that the configuration describes a usable rate limit
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidWindow`] for an empty window and
    /// [`ErrorKind::InvalidLimit`] if no request would ever be allowed.
    pub fn validate(&self) -> Result<()> {
        if self.window.is_zero() {
            return Err(ErrorKind::InvalidWindow);
        }
        if self.limit == 0 {
            return Err(ErrorKind::InvalidLimit);
        }
        Ok(())
    }
}
