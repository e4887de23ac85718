//! TCP reachability prober.
//!
//! Each attempt is a bounded connect; the connection is closed right away
//! because only reachability matters. The deadline is checked once per failed
//! attempt, so noticing it can take up to one connect timeout plus one poll
//! interval.

use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::trace;

use super::deadline::CancelSignal;
use super::error::ProbeError;
use super::event::{EventSink, ProbeEvent, ProbeKind, ProbeStatus};
use super::prober::{ProbeOutcome, Prober};
use super::settings::Settings;
use crate::model::Service;

#[derive(Debug, Clone)]
pub struct TcpProber {
    connect_timeout: Duration,
    poll_interval: Duration,
}

impl TcpProber {
    pub fn new(settings: &Settings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout,
            poll_interval: settings.poll_interval,
        }
    }

    /// Single connect attempt, bounded by the connect timeout.
    pub async fn attempt(&self, endpoint: &str) -> Result<(), ProbeError> {
        match timeout(self.connect_timeout, TcpStream::connect(endpoint)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                Ok(())
            }
            Ok(Err(err)) => Err(ProbeError::Connect(err)),
            Err(_) => Err(ProbeError::ConnectTimeout(self.connect_timeout)),
        }
    }
}

#[async_trait::async_trait]
impl Prober for TcpProber {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Tcp
    }

    async fn wait_until_up(
        &self,
        service: &Service,
        cancel: &CancelSignal,
        sink: &dyn EventSink,
    ) -> ProbeOutcome {
        let endpoint = service.endpoint();
        sink.emit(ProbeEvent::new(service, ProbeKind::Tcp, ProbeStatus::Started));

        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            let err = match self.attempt(&endpoint).await {
                Ok(()) => {
                    sink.emit(ProbeEvent::new(service, ProbeKind::Tcp, ProbeStatus::Up));
                    return ProbeOutcome::Up;
                }
                Err(err) => err,
            };

            if cancel.is_fired() {
                sink.emit(ProbeEvent::new(
                    service,
                    ProbeKind::Tcp,
                    ProbeStatus::TimedOut {
                        last_error: err.to_string(),
                    },
                ));
                return ProbeOutcome::TimedOut(err);
            }

            trace!(
                component = "tcp-prober",
                event = "attempt_failed",
                service = %service.name,
                endpoint = %endpoint,
                attempt = attempts,
                error = %err,
                "tcp connect failed, retrying"
            );
            sleep(self.poll_interval).await;
        }
    }
}
