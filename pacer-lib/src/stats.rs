use std::{collections::VecDeque, time::Duration};

use serde::Serialize;
use serde::ser::SerializeStruct;

/// Number of most recent request times kept for the median
pub const MAX_REQUEST_TIME_SAMPLES: usize = 1000;

/// Record and report statistics of a [`crate::Dispatcher`]
///
/// Only the dispatch worker writes these; owners read snapshots through
/// [`crate::Dispatcher::stats`] or the value returned from
/// [`crate::Dispatcher::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Total number of executed requests, including failed ones
    pub total_requests: u64,
    /// Number of requests for which the transport reported success
    pub successful_requests: u64,
    /// Number of requests for which the transport reported a failure
    pub failed_requests: u64,
    /// Number of times the worker had to wait for the next window
    pub throttled: u64,
    /// Total time spent waiting for the next window
    pub throttled_time: Duration,
    /// Sum of all request times, for the average
    pub total_request_time: Duration,
    /// The most recent request times, at most [`MAX_REQUEST_TIME_SAMPLES`],
    /// for the median
    pub request_times: VecDeque<Duration>,
}

impl DispatchStats {
    /// Record an executed request and how long the transport took
    pub fn record_response(&mut self, success: bool, request_time: Duration) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
        self.total_request_time = self.total_request_time.saturating_add(request_time);
        if self.request_times.len() == MAX_REQUEST_TIME_SAMPLES {
            self.request_times.pop_front();
        }
        self.request_times.push_back(request_time);
    }

    /// Record a throttle delay imposed by the rate limit
    pub fn record_throttle(&mut self, wait: Duration) {
        self.throttled += 1;
        self.throttled_time += wait;
    }

    /// Get median request time over the most recent requests
    #[must_use]
    pub fn median_request_time(&self) -> Option<Duration> {
        if self.request_times.is_empty() {
            return None;
        }

        let mut times: Vec<Duration> = self.request_times.iter().copied().collect();
        times.sort();
        let mid = times.len() / 2;

        if times.len().is_multiple_of(2) {
            // Average of two middle values
            Some((times[mid - 1] + times[mid]) / 2)
        } else {
            Some(times[mid])
        }
    }

    /// Get average request time over all requests
    #[must_use]
    pub fn average_request_time(&self) -> Option<Duration> {
        if self.total_requests == 0 {
            return None;
        }

        let nanos = self.total_request_time.as_nanos() / u128::from(self.total_requests);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    /// Get the success rate (0.0 to 1.0)
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let success_rate = self.successful_requests as f64 / self.total_requests as f64;
            success_rate
        }
    }

    /// Get human-readable summary of the stats
    #[must_use]
    pub fn summary(&self) -> String {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let success_pct = (self.success_rate() * 100.0) as u64;

        let avg_time = self
            .average_request_time()
            .map_or_else(|| "N/A".to_string(), |d| format!("{}ms", d.as_millis()));

        format!(
            "{} requests ({}% success, {} failed), throttled {} times for {}ms, avg: {}",
            self.total_requests,
            success_pct,
            self.failed_requests,
            self.throttled,
            self.throttled_time.as_millis(),
            avg_time
        )
    }
}

impl Serialize for DispatchStats {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let median_request_time_ms = self.median_request_time().map(|d| d.as_millis());

        let mut s = serializer.serialize_struct("DispatchStats", 7)?;
        s.serialize_field("total_requests", &self.total_requests)?;
        s.serialize_field("successful_requests", &self.successful_requests)?;
        s.serialize_field("failed_requests", &self.failed_requests)?;
        s.serialize_field("success_rate", &self.success_rate())?;
        s.serialize_field("throttled", &self.throttled)?;
        s.serialize_field("throttled_time_ms", &self.throttled_time.as_millis())?;
        s.serialize_field("median_request_time_ms", &median_request_time_ms)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_stats_tracking() {
        let mut stats = DispatchStats::default();
        assert!((stats.success_rate() - 1.0).abs() < f64::EPSILON);
        assert_eq!(stats.median_request_time(), None);

        stats.record_response(true, Duration::from_millis(100));
        stats.record_response(false, Duration::from_millis(200));
        stats.record_response(true, Duration::from_millis(150));

        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.successful_requests, 2);
        assert_eq!(stats.failed_requests, 1);
        assert!((stats.success_rate() - (2.0 / 3.0)).abs() < 0.001);
        assert_eq!(
            stats.median_request_time(),
            Some(Duration::from_millis(150))
        );
        assert_eq!(
            stats.average_request_time(),
            Some(Duration::from_millis(150))
        );
    }

    #[test]
    fn test_request_time_samples_are_bounded() {
        let mut stats = DispatchStats::default();
        for _ in 0..MAX_REQUEST_TIME_SAMPLES {
            stats.record_response(true, Duration::from_millis(100));
        }
        for _ in 0..MAX_REQUEST_TIME_SAMPLES {
            stats.record_response(true, Duration::from_millis(300));
        }

        assert_eq!(stats.total_requests, 2 * MAX_REQUEST_TIME_SAMPLES as u64);
        assert_eq!(stats.request_times.len(), MAX_REQUEST_TIME_SAMPLES);
        // The median only sees the most recent samples
        assert_eq!(
            stats.median_request_time(),
            Some(Duration::from_millis(300))
        );
        // The average covers every request
        assert_eq!(
            stats.average_request_time(),
            Some(Duration::from_millis(200))
        );
    }

    #[test]
    fn test_throttle_tracking() {
        let mut stats = DispatchStats::default();
        stats.record_throttle(Duration::from_millis(400));
        stats.record_throttle(Duration::from_millis(600));

        assert_eq!(stats.throttled, 2);
        assert_eq!(stats.throttled_time, Duration::from_secs(1));
    }

    #[test]
    fn test_summary_formatting() {
        let mut stats = DispatchStats::default();
        stats.record_response(true, Duration::from_millis(150));
        stats.record_response(false, Duration::from_millis(200));
        stats.record_throttle(Duration::from_millis(250));

        let summary = stats.summary();
        assert!(summary.contains("2 requests"));
        assert!(summary.contains("50% success"));
        assert!(summary.contains("1 failed"));
        assert!(summary.contains("throttled 1 times for 250ms"));
        assert!(summary.contains("175ms")); // average of 150 and 200
    }

    #[test]
    fn test_serialization() {
        let mut stats = DispatchStats::default();
        stats.record_response(true, Duration::from_millis(10));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_requests"], 1);
        assert_eq!(json["failed_requests"], 0);
        assert_eq!(json["median_request_time_ms"], 10);
    }
}
