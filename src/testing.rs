//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::transport::{Completion, OutgoingRequest, PendingOperation, Transport};

/// How a scripted exchange behaves once issued.
#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Never finishes.
    Hang,
    /// Finishes on the first poll.
    Reply(Completion),
    /// Finishes after the given delay.
    After(Duration, Completion),
}

impl Script {
    pub(crate) fn text(text: &str) -> Self {
        Self::Reply(Completion::Succeeded {
            text: text.to_owned(),
        })
    }

    pub(crate) fn error(error: &str) -> Self {
        Self::Reply(Completion::Failed {
            error: error.to_owned(),
        })
    }
}

/// Replays scripts in order; once exhausted every exchange hangs.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    issued: Arc<Mutex<Vec<(Instant, OutgoingRequest)>>>,
}

impl ScriptedTransport {
    pub(crate) fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into_iter().collect())),
            issued: Arc::default(),
        }
    }

    /// Every exchange hangs.
    pub(crate) fn hanging() -> Self {
        Self::default()
    }

    pub(crate) fn issued_count(&self) -> usize {
        self.issued.lock().expect("issued log poisoned").len()
    }

    pub(crate) fn requests(&self) -> Vec<OutgoingRequest> {
        self.issued
            .lock()
            .expect("issued log poisoned")
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub(crate) fn issue_times(&self) -> Vec<Instant> {
        self.issued
            .lock()
            .expect("issued log poisoned")
            .iter()
            .map(|(at, _)| *at)
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn issue(&self, request: OutgoingRequest) -> PendingOperation {
        self.issued
            .lock()
            .expect("issued log poisoned")
            .push((Instant::now(), request));
        let script = self
            .scripts
            .lock()
            .expect("script queue poisoned")
            .pop_front()
            .unwrap_or(Script::Hang);

        PendingOperation::spawn(async move {
            match script {
                Script::Hang => std::future::pending().await,
                Script::Reply(completion) => completion,
                Script::After(delay, completion) => {
                    tokio::time::sleep(delay).await;
                    completion
                }
            }
        })
    }
}
