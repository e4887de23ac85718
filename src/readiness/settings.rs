// Package readiness provides the immutable settings shared by every prober.

use std::time::Duration;

use super::error::SettingsError;
use crate::model::Service;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Settings for one readiness run.
///
/// Built once at the boundary and handed by value to the orchestrator, which
/// shares it read-only with every probing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Global deadline for all services together.
    pub timeout: Duration,
    /// Services on this port additionally need a successful HTTP GET.
    pub http_port: Option<u16>,
    /// Services on this port are never probed.
    pub ignore_port: Option<u16>,
    /// Upper bound for a single TCP connect attempt.
    pub connect_timeout: Duration,
    /// Sleep between two failed attempts.
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            http_port: None,
            ignore_port: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.timeout.is_zero() {
            return Err(SettingsError::ZeroDuration("timeout"));
        }
        if self.connect_timeout.is_zero() {
            return Err(SettingsError::ZeroDuration("connect_timeout"));
        }
        if self.poll_interval.is_zero() {
            return Err(SettingsError::ZeroDuration("poll_interval"));
        }
        Ok(())
    }

    pub fn is_ignored(&self, service: &Service) -> bool {
        self.ignore_port == Some(service.port)
    }

    pub fn is_http_checked(&self, service: &Service) -> bool {
        self.http_port == Some(service.port)
    }

    /// Worst-case run time of a failing run: the deadline plus the latency a
    /// TCP prober needs to notice it (one connect attempt and one sleep).
    pub fn worst_case_duration(&self) -> Duration {
        self.timeout + self.connect_timeout + self.poll_interval
    }
}
