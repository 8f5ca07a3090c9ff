use std::fmt;

use anyhow::{Context, Result};
use http::header::CONTENT_TYPE;
use pacer_lib::DispatchStats;
use reqwest::{Response, Url};
use serde::Serialize;

/// What happened to a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RequestOutcome {
    /// Position in submission order, starting at 1
    pub(crate) index: usize,
    pub(crate) url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl RequestOutcome {
    pub(crate) fn new(index: usize, url: &Url, result: pacer_lib::Result<Response>) -> Self {
        let mut outcome = Self {
            index,
            url: url.to_string(),
            status: None,
            content_type: None,
            error: None,
        };
        match result {
            Ok(response) => {
                outcome.status = Some(response.status().as_u16());
                outcome.content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(ToString::to_string);
            }
            Err(e) => outcome.error = Some(e.to_string()),
        }
        outcome
    }

    /// The request was executed and answered with a non-error status
    pub(crate) fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_some_and(|code| code < 400)
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.status) {
            (Some(error), _) => write!(f, "Request {} to {} failed: {error}", self.index, self.url),
            (None, Some(status)) => write!(
                f,
                "Request {} to {} completed with status {status} ({})",
                self.index,
                self.url,
                self.content_type.as_deref().unwrap_or("no content type")
            ),
            (None, None) => write!(f, "Request {} to {} has no outcome", self.index, self.url),
        }
    }
}

/// Everything pacer reports once all requests completed
#[derive(Debug, Serialize)]
pub(crate) struct Report {
    pub(crate) requests: Vec<RequestOutcome>,
    pub(crate) stats: DispatchStats,
}

pub(crate) trait ReportFormatter {
    /// Format a single outcome as soon as it is known, if this format
    /// reports progressively
    fn format_outcome(&self, outcome: &RequestOutcome) -> Option<String>;

    /// Format the final report
    fn format_report(&self, report: &Report) -> Result<String>;
}

/// Prints a line per request followed by a one-line summary
pub(crate) struct Compact;

impl ReportFormatter for Compact {
    fn format_outcome(&self, outcome: &RequestOutcome) -> Option<String> {
        Some(outcome.to_string())
    }

    fn format_report(&self, report: &Report) -> Result<String> {
        Ok(report.stats.summary())
    }
}

/// Prints the whole report as one JSON document at the end
pub(crate) struct Json;

impl ReportFormatter for Json {
    fn format_outcome(&self, _outcome: &RequestOutcome) -> Option<String> {
        None
    }

    fn format_report(&self, report: &Report) -> Result<String> {
        serde_json::to_string_pretty(report).context("Cannot format report as JSON")
    }
}
