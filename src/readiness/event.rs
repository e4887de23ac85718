// Package readiness provides the semantic lifecycle events emitted by probers.

use std::fmt;
use std::sync::Mutex;

use crate::model::Service;

/// Kind of probe an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Tcp,
    Http,
}

impl ProbeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeKind::Tcp => "TCP",
            ProbeKind::Http => "HTTP",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Started,
    Up,
    /// The deadline fired before the probe succeeded.
    TimedOut { last_error: String },
    /// The probe gave up without waiting for the deadline.
    Skipped { reason: String },
}

/// One lifecycle event of one probe of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEvent {
    pub service: String,
    pub endpoint: String,
    pub kind: ProbeKind,
    pub status: ProbeStatus,
}

impl ProbeEvent {
    pub fn new(service: &Service, kind: ProbeKind, status: ProbeStatus) -> Self {
        Self {
            service: service.name.clone(),
            endpoint: service.endpoint(),
            kind,
            status,
        }
    }
}

/// Receives probe events. Rendering them is up to the implementor.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProbeEvent);
}

/// Discards every event.
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: ProbeEvent) {}
}

/// Keeps every event in arrival order.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProbeEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProbeEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns the events of one service.
    pub fn events_for(&self, service: &str) -> Vec<ProbeEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.service == service)
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: ProbeEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
