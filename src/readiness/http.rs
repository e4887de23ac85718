//! HTTP readiness prober.
//!
//! Runs after the TCP prober succeeded for services on the HTTP-checked port.
//! Each attempt opens its own connection and sends `GET /` from a spawned
//! task that owns the socket. The probe races that task against the deadline;
//! when the deadline wins the task is aborted and then awaited, so the socket
//! is closed before the probe returns. Any HTTP status counts as up, only
//! transport failures are retried.

use bytes::Bytes;
use http_body_util::Empty;
use hyper::header::{HeaderValue, HOST, USER_AGENT};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{trace, warn};

use super::deadline::CancelSignal;
use super::error::ProbeError;
use super::event::{EventSink, ProbeEvent, ProbeKind, ProbeStatus};
use super::prober::{ProbeOutcome, Prober};
use super::settings::Settings;
use crate::model::Service;

const PROBE_USER_AGENT: &str = concat!("svcwait/", env!("CARGO_PKG_VERSION"));

/// Request ready to be sent, together with the address to dial.
pub struct ProbeRequest {
    url: Uri,
    authority: String,
    request: Request<Empty<Bytes>>,
}

impl ProbeRequest {
    /// Builds `GET /` for `endpoint`. Fails when the endpoint cannot form a
    /// valid URL, which no amount of retrying will fix.
    pub fn build(endpoint: &str) -> Result<Self, ProbeError> {
        let url = format!("http://{}/", endpoint);
        let invalid = |reason: String| ProbeError::InvalidRequest {
            url: url.clone(),
            reason,
        };

        let uri: Uri = url
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| invalid(e.to_string()))?;
        let authority = uri
            .authority()
            .map(|a| a.as_str().to_string())
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let host = HeaderValue::from_str(&authority).map_err(|e| invalid(e.to_string()))?;

        // Origin form on the wire; the authority travels in the Host header.
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(HOST, host)
            .header(USER_AGENT, PROBE_USER_AGENT)
            .body(Empty::<Bytes>::new())
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            url: uri,
            authority,
            request,
        })
    }

    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Dials the endpoint and sends the request over a fresh HTTP/1 connection.
    ///
    /// The connection is driven inside this future, so dropping the future
    /// closes the socket. A server that answers and then closes the
    /// connection (HTTP/1.0 style or `Connection: close`) still counts as
    /// having responded.
    pub async fn send(self) -> Result<StatusCode, ProbeError> {
        let stream = TcpStream::connect(self.authority.as_str())
            .await
            .map_err(ProbeError::Connect)?;
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(ProbeError::Http)?;
        let response = sender.send_request(self.request);
        tokio::pin!(conn);
        tokio::pin!(response);

        tokio::select! {
            biased;
            rsp = &mut response => rsp.map(|rsp| rsp.status()).map_err(ProbeError::Http),
            closed = &mut conn => {
                // The connection may end in the same poll that delivered the
                // response; the response future resolves either way once the
                // connection is gone.
                match response.await {
                    Ok(rsp) => Ok(rsp.status()),
                    Err(_) => match closed {
                        Err(err) => Err(ProbeError::Http(err)),
                        Ok(()) => Err(ProbeError::ConnectionClosed),
                    },
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpProber {
    poll_interval: Duration,
}

impl HttpProber {
    pub fn new(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval,
        }
    }

    fn timed_out(
        &self,
        service: &Service,
        sink: &dyn EventSink,
        last_error: Option<ProbeError>,
    ) -> ProbeOutcome {
        let err = last_error.unwrap_or(ProbeError::Aborted);
        sink.emit(ProbeEvent::new(
            service,
            ProbeKind::Http,
            ProbeStatus::TimedOut {
                last_error: err.to_string(),
            },
        ));
        ProbeOutcome::TimedOut(err)
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Http
    }

    async fn wait_until_up(
        &self,
        service: &Service,
        cancel: &CancelSignal,
        sink: &dyn EventSink,
    ) -> ProbeOutcome {
        let endpoint = service.endpoint();
        sink.emit(ProbeEvent::new(service, ProbeKind::Http, ProbeStatus::Started));

        let mut last_error: Option<ProbeError> = None;
        loop {
            let request = match ProbeRequest::build(&endpoint) {
                Ok(request) => request,
                Err(err) => {
                    warn!(
                        component = "http-prober",
                        event = "invalid_request",
                        service = %service.name,
                        error = %err,
                        "failed to create request, skipping service"
                    );
                    sink.emit(ProbeEvent::new(
                        service,
                        ProbeKind::Http,
                        ProbeStatus::Skipped {
                            reason: err.to_string(),
                        },
                    ));
                    return ProbeOutcome::Skipped(err);
                }
            };

            let mut call = tokio::spawn(request.send());
            let joined = tokio::select! {
                joined = &mut call => joined,
                _ = cancel.fired() => {
                    call.abort();
                    let outcome = self.timed_out(service, sink, last_error);
                    // Drain the aborted call so nothing outlives the probe.
                    let _ = call.await;
                    return outcome;
                }
            };

            match joined {
                Ok(Ok(status)) => {
                    trace!(
                        component = "http-prober",
                        event = "response",
                        service = %service.name,
                        status = status.as_u16(),
                        "http probe got a response"
                    );
                    sink.emit(ProbeEvent::new(service, ProbeKind::Http, ProbeStatus::Up));
                    return ProbeOutcome::Up;
                }
                Ok(Err(err)) => last_error = Some(err),
                Err(join_err) => {
                    warn!(
                        component = "http-prober",
                        event = "call_failed",
                        service = %service.name,
                        error = %join_err,
                        "http probe task ended abnormally"
                    );
                    last_error = Some(ProbeError::Aborted);
                }
            }

            if cancel.is_fired() {
                return self.timed_out(service, sink, last_error);
            }

            trace!(
                component = "http-prober",
                event = "attempt_failed",
                service = %service.name,
                endpoint = %endpoint,
                error = ?last_error,
                "http request failed, retrying"
            );
            sleep(self.poll_interval).await;
        }
    }
}
