// Package report renders readiness events and the run summary as log lines.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::readiness::{EventSink, ProbeEvent, ProbeStatus, RunReport, ServiceState, Verdict};

/// Writes every probe event through `tracing`.
pub struct LogReporter;

impl EventSink for LogReporter {
    fn emit(&self, event: ProbeEvent) {
        let kind = event.kind.as_str();
        match event.status {
            ProbeStatus::Started => debug!(
                component = "probe",
                event = "started",
                kind,
                service = %event.service,
                endpoint = %event.endpoint,
                "{}: waiting for service {} ({})", kind, event.service, event.endpoint
            ),
            ProbeStatus::Up => info!(
                component = "probe",
                event = "up",
                kind,
                service = %event.service,
                endpoint = %event.endpoint,
                "{}: service {} ({}) is up", kind, event.service, event.endpoint
            ),
            ProbeStatus::TimedOut { last_error } => error!(
                component = "probe",
                event = "timed_out",
                kind,
                service = %event.service,
                endpoint = %event.endpoint,
                last_error = %last_error,
                "{}: service {} ({}) timed out. Last error: {}",
                kind, event.service, event.endpoint, last_error
            ),
            ProbeStatus::Skipped { reason } => warn!(
                component = "probe",
                event = "skipped",
                kind,
                service = %event.service,
                endpoint = %event.endpoint,
                reason = %reason,
                "{}: skipping service {} ({}): {}", kind, event.service, event.endpoint, reason
            ),
        }
    }
}

pub fn log_start(services: usize) {
    info!(
        component = "main",
        event = "waiting",
        services,
        "Waiting for {} services to be ready...", services
    );
}

/// Logs the final summary of a run.
pub fn log_summary(report: &RunReport, timeout: Duration) {
    match report.verdict {
        Verdict::AllUp => info!(
            component = "main",
            event = "all_up",
            elapsed = ?report.elapsed,
            ignored = report.ignored,
            "All services are up after {:?}!", report.elapsed
        ),
        Verdict::TimedOut => {
            let pending: Vec<&str> = report
                .results
                .iter()
                .filter(|r| !matches!(r.state, ServiceState::Up))
                .map(|r| r.service.name.as_str())
                .collect();
            error!(
                component = "main",
                event = "timed_out",
                timeout = %humantime::format_duration(timeout),
                pending = ?pending,
                "One or more services timed out after {}", humantime::format_duration(timeout)
            )
        }
    }
}
