use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::time::Instant;

use crate::ratelimit::RateLimitConfig;
use crate::{ErrorKind, Result};

/// Decision taken for the next request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may be executed right away
    Ready,
    /// The window's quota is used up; wait this long for the next window
    Throttled(Duration),
}

/// A fixed (non-sliding) rate limit window.
///
/// The counter resets completely once `duration` has elapsed since the
/// start of the current window. The first window opens with the first
/// request, so no more than `limit` requests ever run within `duration`
/// of a reset.
///
/// This state is owned by a single dispatch worker and needs no locking.
#[derive(Debug, Clone)]
pub struct FixedWindow {
    start: Option<Instant>,
    count: usize,
    limit: NonZeroUsize,
    duration: Duration,
}

impl FixedWindow {
    /// Create a window allowing `limit` requests per `duration`
    #[must_use]
    pub const fn new(limit: NonZeroUsize, duration: Duration) -> Self {
        Self {
            start: None,
            count: 0,
            limit,
            duration,
        }
    }

    /// Decide whether a request arriving at `now` may run.
    ///
    /// Opens a fresh window if none is open yet or the current one has
    /// elapsed. Otherwise the request is admitted while the quota lasts, and
    /// throttled for the remainder of the window after that.
    pub fn check(&mut self, now: Instant) -> Admission {
        let Some(start) = self.start else {
            self.reset(now);
            return Admission::Ready;
        };

        let elapsed = now.saturating_duration_since(start);
        if elapsed >= self.duration {
            self.reset(now);
            return Admission::Ready;
        }

        if self.count < self.limit.get() {
            Admission::Ready
        } else {
            Admission::Throttled(self.duration - elapsed)
        }
    }

    /// Start a new window at `now`. The start never moves backwards.
    pub fn reset(&mut self, now: Instant) {
        self.count = 0;
        self.start = Some(self.start.map_or(now, |start| start.max(now)));
    }

    /// Count one executed request against the current window
    pub const fn record(&mut self) {
        self.count += 1;
    }

    /// Requests executed in the current window
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Start of the current window, if one is open
    #[must_use]
    pub const fn start(&self) -> Option<Instant> {
        self.start
    }

    /// Maximum number of requests per window
    #[must_use]
    pub const fn limit(&self) -> NonZeroUsize {
        self.limit
    }

    /// Length of a window
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

impl TryFrom<RateLimitConfig> for FixedWindow {
    type Error = ErrorKind;

    fn try_from(config: RateLimitConfig) -> Result<Self> {
        config.validate()?;
        let limit = NonZeroUsize::new(config.limit).ok_or(ErrorKind::InvalidLimit)?;
        Ok(Self::new(limit, config.window))
    }
}
