//! Readiness orchestrator.
//!
//! Spawns one task per non-ignored service (TCP probe, then HTTP probe for the
//! HTTP-checked port), waits for every task, and then decides the verdict by
//! trying to stop the deadline timer.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::deadline::{CancelSignal, Deadline};
use super::error::{ProbeError, SettingsError};
use super::event::{EventSink, ProbeKind};
use super::http::HttpProber;
use super::prober::{ProbeOutcome, Prober};
use super::settings::Settings;
use super::tcp::TcpProber;
use crate::model::Service;

/// Outcome of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every probed service finished before the deadline fired.
    AllUp,
    /// The deadline fired before every service finished.
    TimedOut,
}

impl Verdict {
    pub fn is_success(self) -> bool {
        self == Verdict::AllUp
    }

    pub fn exit_code(self) -> u8 {
        match self {
            Verdict::AllUp => 0,
            Verdict::TimedOut => 1,
        }
    }
}

/// Terminal state of one service.
#[derive(Debug)]
pub enum ServiceState {
    Up,
    TimedOut { kind: ProbeKind, last_error: ProbeError },
    Skipped { kind: ProbeKind, reason: ProbeError },
}

impl ServiceState {
    pub fn is_up(&self) -> bool {
        matches!(self, ServiceState::Up)
    }

    fn from_outcome(kind: ProbeKind, outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Up => ServiceState::Up,
            ProbeOutcome::TimedOut(last_error) => ServiceState::TimedOut { kind, last_error },
            ProbeOutcome::Skipped(reason) => ServiceState::Skipped { kind, reason },
        }
    }
}

#[derive(Debug)]
pub struct ServiceResult {
    pub service: Service,
    pub state: ServiceState,
}

#[derive(Debug)]
pub struct RunReport {
    pub verdict: Verdict,
    pub elapsed: Duration,
    /// One entry per probed service, in input order.
    pub results: Vec<ServiceResult>,
    /// Services left out because they are on the ignored port.
    pub ignored: usize,
}

impl RunReport {
    pub fn result(&self, name: &str) -> Option<&ServiceResult> {
        self.results.iter().find(|r| r.service.name == name)
    }
}

pub struct Orchestrator {
    settings: Arc<Settings>,
    tcp: Arc<dyn Prober>,
    http: Arc<dyn Prober>,
    sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    pub fn new(settings: Settings, sink: Arc<dyn EventSink>) -> Result<Self, SettingsError> {
        let tcp = Arc::new(TcpProber::new(&settings));
        let http = Arc::new(HttpProber::new(&settings));
        Self::with_probers(settings, tcp, http, sink)
    }

    /// Builds an orchestrator around custom probers for the two stages.
    pub fn with_probers(
        settings: Settings,
        tcp: Arc<dyn Prober>,
        http: Arc<dyn Prober>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            settings: Arc::new(settings),
            tcp,
            http,
            sink,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Probes all services concurrently and returns once every task is done.
    pub async fn run(&self, services: &[Service]) -> RunReport {
        let begin = Instant::now();
        let deadline = Deadline::arm(self.settings.timeout);

        let (probed, ignored): (Vec<&Service>, Vec<&Service>) = services
            .iter()
            .partition(|svc| !self.settings.is_ignored(svc));
        for svc in &ignored {
            debug!(
                component = "orchestrator",
                event = "service_ignored",
                service = %svc.name,
                port = svc.port,
                "service on ignored port, not probing"
            );
        }

        let tasks: Vec<_> = probed
            .iter()
            .map(|svc| {
                let service = (*svc).clone();
                let signal = deadline.signal();
                let tcp = self.tcp.clone();
                let http = self.http.clone();
                let sink = self.sink.clone();
                let http_checked = self.settings.is_http_checked(svc);
                tokio::spawn(async move {
                    let state =
                        probe_service(&service, &signal, tcp, http, http_checked, sink.as_ref())
                            .await;
                    ServiceResult { service, state }
                })
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        let mut failed_tasks = 0usize;
        for (svc, joined) in probed.into_iter().zip(join_all(tasks).await) {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => {
                    failed_tasks += 1;
                    error!(
                        component = "orchestrator",
                        event = "task_failed",
                        service = %svc.name,
                        error = %err,
                        "probing task ended abnormally"
                    );
                    results.push(ServiceResult {
                        service: svc.clone(),
                        state: ServiceState::Skipped {
                            kind: ProbeKind::Tcp,
                            reason: ProbeError::Aborted,
                        },
                    });
                }
            }
        }

        // Fired between the last task finishing and this check counts as a
        // timeout; see Deadline::stop_if_not_fired.
        let stopped = deadline.stop_if_not_fired();
        // A task that died never saw its service come up.
        let verdict = if stopped && failed_tasks == 0 {
            Verdict::AllUp
        } else {
            Verdict::TimedOut
        };

        RunReport {
            verdict,
            elapsed: begin.elapsed(),
            results,
            ignored: ignored.len(),
        }
    }
}

/// Per-service state machine: TCP first, then HTTP when the port is checked.
async fn probe_service(
    service: &Service,
    signal: &CancelSignal,
    tcp: Arc<dyn Prober>,
    http: Arc<dyn Prober>,
    http_checked: bool,
    sink: &dyn EventSink,
) -> ServiceState {
    let outcome = tcp.wait_until_up(service, signal, sink).await;
    if !outcome.is_up() || !http_checked {
        return ServiceState::from_outcome(tcp.kind(), outcome);
    }

    let outcome = http.wait_until_up(service, signal, sink).await;
    if let ProbeOutcome::Skipped(_) = outcome {
        // A skipped service never becomes ready; hold the task until the
        // deadline so the run fails instead of finishing early.
        signal.fired().await;
    }
    ServiceState::from_outcome(http.kind(), outcome)
}
