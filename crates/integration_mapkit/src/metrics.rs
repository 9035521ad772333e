//! Per-request metrics hook
//!
//! The client calls [`MetricsReporter::new_request`] once per logical
//! request and finishes the returned handle exactly once with the outcome,
//! whatever that outcome is.

use std::time::Duration;

use crate::error::MapKitError;

/// Outcome of one logical request
#[derive(Debug, Clone, Copy)]
pub struct RequestOutcome<'a> {
    /// The caller cancelled before the request completed
    pub cancelled: bool,
    /// Error returned to the caller, if any
    pub error: Option<&'a MapKitError>,
    /// Raw (decompressed) response body, when one was received
    pub raw_response: Option<&'a [u8]>,
    /// Host the request was sent to
    pub origin: &'a str,
    /// Wall time from rate limiter entry to decode
    pub elapsed: Duration,
}

impl RequestOutcome<'_> {
    /// Short label for the outcome: `ok`, `cancelled`, `api_error`, `error`
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.error {
            _ if self.cancelled => "cancelled",
            None => "ok",
            Some(err) if err.is_api_error() => "api_error",
            Some(_) => "error",
        }
    }
}

/// Factory for per-request metric handles
pub trait MetricsReporter: Send + Sync + std::fmt::Debug {
    /// Start tracking a request to the named endpoint
    fn new_request(&self, name: &str) -> Box<dyn RequestMetrics>;
}

/// Handle for one in-flight request
pub trait RequestMetrics: Send {
    /// Record the outcome; consumes the handle so it can only end once
    fn end_request(self: Box<Self>, outcome: &RequestOutcome<'_>);
}

/// Reporter that records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReporter;

struct NoOpRequest;

impl MetricsReporter for NoOpReporter {
    fn new_request(&self, _name: &str) -> Box<dyn RequestMetrics> {
        Box::new(NoOpRequest)
    }
}

impl RequestMetrics for NoOpRequest {
    fn end_request(self: Box<Self>, _outcome: &RequestOutcome<'_>) {}
}

/// Reporter backed by the `metrics` facade
///
/// Emits `mapkit_requests_total{endpoint,outcome}` and
/// `mapkit_request_duration_seconds{endpoint}`. Nothing is exported unless
/// the application installs a recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsFacadeReporter;

struct FacadeRequest {
    endpoint: String,
}

impl MetricsReporter for MetricsFacadeReporter {
    fn new_request(&self, name: &str) -> Box<dyn RequestMetrics> {
        Box::new(FacadeRequest {
            endpoint: name.to_string(),
        })
    }
}

impl RequestMetrics for FacadeRequest {
    fn end_request(self: Box<Self>, outcome: &RequestOutcome<'_>) {
        ::metrics::counter!(
            "mapkit_requests_total",
            "endpoint" => self.endpoint.clone(),
            "outcome" => outcome.label(),
        )
        .increment(1);
        ::metrics::histogram!(
            "mapkit_request_duration_seconds",
            "endpoint" => self.endpoint,
        )
        .record(outcome.elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::models::{ReturnCode, ReturnDesc};

    fn outcome<'a>(cancelled: bool, error: Option<&'a MapKitError>) -> RequestOutcome<'a> {
        RequestOutcome {
            cancelled,
            error,
            raw_response: None,
            origin: "https://mapapi.cloud.huawei.com",
            elapsed: Duration::from_millis(12),
        }
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome(false, None).label(), "ok");

        let cancelled = MapKitError::Cancelled { context: "send" };
        assert_eq!(outcome(true, Some(&cancelled)).label(), "cancelled");

        let api = MapKitError::ApiStatus {
            context: "directions",
            return_code: ReturnCode::INVALID_REQUEST,
            return_desc: ReturnDesc::INVALID_REQUEST,
        };
        assert_eq!(outcome(false, Some(&api)).label(), "api_error");

        let validation = MapKitError::from(ValidationError::MissingOrigin);
        assert_eq!(outcome(false, Some(&validation)).label(), "error");
    }

    #[test]
    fn test_reporters_accept_outcomes_without_recorder() {
        let reporters: [&dyn MetricsReporter; 2] = [&NoOpReporter, &MetricsFacadeReporter];
        for reporter in reporters {
            reporter
                .new_request("directions")
                .end_request(&outcome(false, None));
        }
    }
}
