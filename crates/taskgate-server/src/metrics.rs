//! Prometheus metrics collection and formatting.
//!
//! This module provides metrics in Prometheus text exposition format.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use taskgate_core::ErrorKind;

use crate::state::AppState;

/// Endpoints that count towards `taskgate_requests_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Run,
    Read,
}

impl Endpoint {
    fn label(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Read => "read",
        }
    }
}

/// Request counters, shared by all handlers.
#[derive(Debug)]
pub struct RequestMetrics {
    run: AtomicU64,
    read: AtomicU64,
    /// Indexed like [`ErrorKind::ALL`].
    failed: [AtomicU64; ErrorKind::ALL.len()],
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self {
            run: AtomicU64::new(0),
            read: AtomicU64::new(0),
            failed: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }
}

impl RequestMetrics {
    /// Count a request to `endpoint`.
    pub fn record_request(&self, endpoint: Endpoint) {
        self.counter(endpoint).fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed request.
    pub fn record_failure(&self, kind: ErrorKind) {
        if let Some(i) = ErrorKind::ALL.iter().position(|k| *k == kind) {
            self.failed[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Requests seen by `endpoint`.
    pub fn requests(&self, endpoint: Endpoint) -> u64 {
        self.counter(endpoint).load(Ordering::Relaxed)
    }

    /// Failures of `kind`.
    pub fn failures(&self, kind: ErrorKind) -> u64 {
        ErrorKind::ALL
            .iter()
            .position(|k| *k == kind)
            .map(|i| self.failed[i].load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn counter(&self, endpoint: Endpoint) -> &AtomicU64 {
        match endpoint {
            Endpoint::Run => &self.run,
            Endpoint::Read => &self.read,
        }
    }
}

/// Collect all metrics from AppState and format as Prometheus text.
pub fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();

    collect_request_metrics(state, &mut output);
    collect_failure_metrics(state, &mut output);
    collect_executor_metrics(state, &mut output);

    output
}

fn collect_request_metrics(state: &Arc<AppState>, output: &mut String) {
    writeln!(
        output,
        "# HELP taskgate_requests_total Total number of requests by endpoint"
    )
    .ok();
    writeln!(output, "# TYPE taskgate_requests_total counter").ok();
    for endpoint in [Endpoint::Run, Endpoint::Read] {
        writeln!(
            output,
            "taskgate_requests_total{{endpoint=\"{}\"}} {}",
            endpoint.label(),
            state.metrics.requests(endpoint)
        )
        .ok();
    }
}

fn collect_failure_metrics(state: &Arc<AppState>, output: &mut String) {
    writeln!(output).ok();
    writeln!(
        output,
        "# HELP taskgate_requests_failed_total Failed requests by error kind"
    )
    .ok();
    writeln!(output, "# TYPE taskgate_requests_failed_total counter").ok();
    for kind in ErrorKind::ALL {
        writeln!(
            output,
            "taskgate_requests_failed_total{{kind=\"{}\"}} {}",
            kind.code(),
            state.metrics.failures(kind)
        )
        .ok();
    }
}

fn collect_executor_metrics(state: &Arc<AppState>, output: &mut String) {
    let registered = state.dispatcher.registry().categories().len();

    writeln!(output).ok();
    writeln!(
        output,
        "# HELP taskgate_executors_registered Number of task categories with an executor"
    )
    .ok();
    writeln!(output, "# TYPE taskgate_executors_registered gauge").ok();
    writeln!(output, "taskgate_executors_registered {registered}").ok();
}
