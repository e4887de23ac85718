// Package readiness provides the Prober trait shared by the TCP and HTTP probers.

use super::deadline::CancelSignal;
use super::error::ProbeError;
use super::event::{EventSink, ProbeKind};
use crate::model::Service;

/// Terminal result of one probe loop.
#[derive(Debug)]
pub enum ProbeOutcome {
    Up,
    /// The deadline fired; carries the last error observed before it did.
    TimedOut(ProbeError),
    /// A non-retryable error ended the probe before the deadline.
    Skipped(ProbeError),
}

impl ProbeOutcome {
    pub fn is_up(&self) -> bool {
        matches!(self, ProbeOutcome::Up)
    }
}

/// Prober waits until one service passes its check or the deadline fires.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    fn kind(&self) -> ProbeKind;

    /// Retries the check until it succeeds, the signal fires, or a
    /// non-retryable error occurs. Emits `Started` and exactly one terminal
    /// event to `sink`.
    async fn wait_until_up(
        &self,
        service: &Service,
        cancel: &CancelSignal,
        sink: &dyn EventSink,
    ) -> ProbeOutcome;
}
