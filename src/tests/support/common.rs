// Common test utilities for readiness tests.

use std::sync::Arc;
use std::time::Duration;

use crate::model::Service;
use crate::readiness::{
    CancelSignal, CollectingSink, EventSink, Orchestrator, ProbeEvent, ProbeKind, ProbeOutcome,
    ProbeStatus, Prober, Settings,
};

pub const FAST_CONNECT_TIMEOUT: Duration = Duration::from_millis(100);
pub const FAST_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Settings with short attempt timings so failing runs finish quickly.
pub fn fast_settings(timeout: Duration) -> Settings {
    Settings {
        timeout,
        connect_timeout: FAST_CONNECT_TIMEOUT,
        poll_interval: FAST_POLL_INTERVAL,
        ..Settings::default()
    }
}

pub fn local_service(name: &str, port: u16) -> Service {
    Service::new(name, "127.0.0.1", port)
}

/// Builds an orchestrator that records every event.
pub fn recording_orchestrator(settings: Settings) -> (Orchestrator, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let orchestrator = Orchestrator::new(settings, sink.clone() as Arc<dyn EventSink>).unwrap();
    (orchestrator, sink)
}

/// Returns only the terminal statuses, dropping `Started`.
pub fn terminal_statuses(sink: &CollectingSink, service: &str) -> Vec<ProbeStatus> {
    sink.events_for(service)
        .into_iter()
        .map(|e| e.status)
        .filter(|s| *s != ProbeStatus::Started)
        .collect()
}

/// Prober that panics, for checking how the orchestrator treats a dead task.
pub struct PanickingProber;

#[async_trait::async_trait]
impl Prober for PanickingProber {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Tcp
    }

    async fn wait_until_up(
        &self,
        service: &Service,
        _cancel: &CancelSignal,
        _sink: &dyn EventSink,
    ) -> ProbeOutcome {
        panic!("prober crashed on {}", service.name);
    }
}

/// TCP stage stand-in that reports every service as reachable at once.
pub struct AlwaysUpProber;

#[async_trait::async_trait]
impl Prober for AlwaysUpProber {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Tcp
    }

    async fn wait_until_up(
        &self,
        service: &Service,
        _cancel: &CancelSignal,
        sink: &dyn EventSink,
    ) -> ProbeOutcome {
        sink.emit(ProbeEvent::new(service, ProbeKind::Tcp, ProbeStatus::Up));
        ProbeOutcome::Up
    }
}
