//! Concurrent readiness polling.
//!
//! The orchestrator arms one global [`Deadline`] and runs a TCP prober (and,
//! for the HTTP-checked port, an HTTP prober) per service. Probers only read
//! the deadline's [`CancelSignal`]; the orchestrator alone decides the
//! [`Verdict`].

pub mod deadline;
pub mod error;
pub mod event;
pub mod http;
pub mod orchestrator;
pub mod prober;
pub mod settings;
pub mod tcp;



// Re-export main types
pub use deadline::{CancelSignal, Deadline};
pub use error::{ProbeError, SettingsError};
pub use event::{CollectingSink, EventSink, NoopSink, ProbeEvent, ProbeKind, ProbeStatus};
pub use http::HttpProber;
pub use orchestrator::{Orchestrator, RunReport, ServiceResult, ServiceState, Verdict};
pub use prober::{ProbeOutcome, Prober};
pub use settings::Settings;
pub use tcp::TcpProber;
