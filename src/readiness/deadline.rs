//! One-shot global deadline shared by all probers.
//!
//! The timer task is the only writer. Probers hold a [`CancelSignal`] and can
//! only read it: either poll [`CancelSignal::is_fired`] between attempts or
//! await [`CancelSignal::fired`] to race it against in-flight work.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const STOPPED: u8 = 2;

/// Read-only view of the deadline handed to every prober.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    state: Arc<AtomicU8>,
    token: CancellationToken,
}

impl CancelSignal {
    /// Non-blocking check; once it returns true it never returns false again.
    pub fn is_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    /// Resolves when the deadline fires. Never resolves if it was stopped first.
    pub async fn fired(&self) {
        self.token.cancelled().await
    }
}

/// Owner side of the deadline: arms the timer and decides the verdict.
pub struct Deadline {
    state: Arc<AtomicU8>,
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    /// Starts a timer that fires the signal once `after` has elapsed.
    pub fn arm(after: Duration) -> Self {
        let state = Arc::new(AtomicU8::new(ARMED));
        let token = CancellationToken::new();

        let timer_state = state.clone();
        let timer_token = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if timer_state
                .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                debug!(
                    component = "deadline",
                    event = "fired",
                    after = ?after,
                    "global deadline elapsed"
                );
                timer_token.cancel();
            }
        });

        Self {
            state,
            token,
            timer,
        }
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            state: self.state.clone(),
            token: self.token.clone(),
        }
    }

    pub fn is_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    /// Stops the pending timer and reports whether it was still pending.
    ///
    /// `true` means the deadline had not fired, so every task finished in time.
    /// The caller runs this after all probers have returned; if the timer
    /// fires between the last prober returning and this call, the run is
    /// reported as timed out although every service came up. That window is
    /// at most the scheduling gap between the two and is accepted.
    pub fn stop_if_not_fired(&self) -> bool {
        let stopped = self
            .state
            .compare_exchange(ARMED, STOPPED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if stopped {
            self.timer.abort();
        }
        stopped
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
