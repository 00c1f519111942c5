//! Attempt driver: issues one exchange at a time and races it against the
//! per-attempt deadline and the cancellation scope.

use std::time::Duration;

use reqwest::Method;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    transport::{OutgoingRequest, PendingState, Transport},
    ConnectorError, Result, RetryPolicy,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OperationKind {
    Read,
    Create,
    Update,
}

impl OperationKind {
    pub(crate) fn method(self) -> Method {
        match self {
            Self::Read => Method::GET,
            Self::Create => Method::POST,
            Self::Update => Method::PUT,
        }
    }

    /// Only updates stop waiting as soon as cancellation is requested;
    /// the others observe it through the suspend point and fail.
    fn checks_cancel_mid_flight(self) -> bool {
        matches!(self, Self::Update)
    }
}

/// Retry bookkeeping for a single call. Dropped when the call returns.
#[derive(Debug)]
struct AttemptState {
    attempts_so_far: usize,
    started: Instant,
}

impl AttemptState {
    fn new() -> Self {
        Self {
            attempts_so_far: 0,
            started: Instant::now(),
        }
    }

    fn restart_clock(&mut self) {
        self.started = Instant::now();
    }

    fn deadline(&self, timeout: Duration) -> Instant {
        self.started + timeout
    }

    fn can_retry(&self, policy: &RetryPolicy) -> bool {
        self.attempts_so_far < policy.max_retries
    }

    fn record_retry(&mut self) {
        self.attempts_so_far += 1;
    }

    /// One-based number of the attempt currently running.
    fn attempt_number(&self) -> usize {
        self.attempts_so_far + 1
    }
}

/// Outcome of a whole call: the state of the last attempt's handle.
#[derive(Debug)]
pub(crate) struct CallReport {
    pub(crate) state: PendingState,
    pub(crate) attempts: usize,
}

enum Wake {
    Completed,
    Abandoned,
    DeadlineExceeded,
}

/// Runs attempts until one completes, the retry budget is spent, or
/// cancellation stops the call.
///
/// Attempts are strictly sequential: a timed-out exchange is aborted before
/// the next one is issued.
pub(crate) async fn drive<T>(
    transport: &T,
    policy: &RetryPolicy,
    request: &OutgoingRequest,
    kind: OperationKind,
    cancel: &CancellationToken,
) -> Result<CallReport>
where
    T: Transport + ?Sized,
{
    let mut state = AttemptState::new();

    loop {
        state.restart_clock();
        tracing::info!(
            method = %request.method,
            url = %request.url,
            attempt = state.attempt_number(),
            "request issued"
        );
        let mut pending = transport.issue(request.clone());
        let deadline = sleep_until(state.deadline(policy.attempt_timeout()));
        tokio::pin!(deadline);

        let wake = tokio::select! {
            biased;
            _ = pending.wait() => Wake::Completed,
            _ = cancel.cancelled(), if kind.checks_cancel_mid_flight() => Wake::Abandoned,
            _ = &mut deadline => Wake::DeadlineExceeded,
            _ = cancel.cancelled() => {
                tracing::debug!(attempt = state.attempt_number(), "suspended attempt cancelled");
                return Err(ConnectorError::Cancelled);
            }
        };

        match wake {
            Wake::DeadlineExceeded if state.can_retry(policy) => {
                tracing::warn!(
                    attempt = state.attempt_number(),
                    timeout_ms = policy.attempt_timeout_ms,
                    "attempt deadline exceeded, retrying"
                );
                state.record_retry();
            }
            Wake::DeadlineExceeded => {
                tracing::warn!(
                    attempts = state.attempt_number(),
                    "retry budget exhausted, accepting unfinished exchange"
                );
                return Ok(CallReport {
                    attempts: state.attempt_number(),
                    state: pending.finish().await,
                });
            }
            Wake::Completed | Wake::Abandoned => {
                return Ok(CallReport {
                    attempts: state.attempt_number(),
                    state: pending.finish().await,
                });
            }
        }
    }
}
