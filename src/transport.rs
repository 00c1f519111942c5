use std::fmt;
use std::future::Future;

use reqwest::{header, Method, StatusCode};
use tokio::task::JoinHandle;
use url::Url;

/// One request as handed to a [`Transport`]. Cloned once per attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<RequestBody>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestBody {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Final result of a transport exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    Succeeded { text: String },
    Failed { error: String },
}

/// Observable state of a [`PendingOperation`].
///
/// `InProgress` is what callers see when an attempt was abandoned before the
/// transport finished; it is neither a success nor a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingState {
    InProgress,
    Succeeded { text: String },
    Failed { error: String },
}

impl From<Completion> for PendingState {
    fn from(completion: Completion) -> Self {
        match completion {
            Completion::Succeeded { text } => Self::Succeeded { text },
            Completion::Failed { error } => Self::Failed { error },
        }
    }
}

/// Performs network exchanges on behalf of the orchestrator.
///
/// Every call to [`Transport::issue`] must start a fresh exchange; the
/// orchestrator owns deadlines and retries.
pub trait Transport: Send + Sync {
    fn issue(&self, request: OutgoingRequest) -> PendingOperation;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn issue(&self, request: OutgoingRequest) -> PendingOperation {
        (**self).issue(request)
    }
}

/// Handle to an in-flight exchange running on its own Tokio task.
///
/// Dropping the handle aborts the exchange.
pub struct PendingOperation {
    task: Option<JoinHandle<Completion>>,
    completed: Option<Completion>,
}

impl PendingOperation {
    /// Runs `exchange` on a new task. Must be called inside a Tokio runtime.
    pub fn spawn<F>(exchange: F) -> Self
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        Self {
            task: Some(tokio::spawn(exchange)),
            completed: None,
        }
    }

    /// Handle whose result is already known.
    pub fn ready(completion: Completion) -> Self {
        Self {
            task: None,
            completed: Some(completion),
        }
    }

    pub fn is_done(&self) -> bool {
        self.completed.is_some()
            || self
                .task
                .as_ref()
                .is_some_and(|task| task.is_finished())
    }

    /// Waits until the exchange finishes. Cancel-safe.
    pub async fn wait(&mut self) {
        if self.completed.is_some() {
            return;
        }
        let Some(task) = self.task.as_mut() else {
            return;
        };
        let completion = match task.await {
            Ok(completion) => completion,
            Err(err) => Completion::Failed {
                error: format!("transport task ended abnormally: {err}"),
            },
        };
        self.completed = Some(completion);
    }

    /// Consumes the handle and reports its current state without waiting
    /// on an unfinished exchange.
    pub async fn finish(mut self) -> PendingState {
        if self.is_done() {
            self.wait().await;
        }
        match self.completed.take() {
            Some(completion) => completion.into(),
            None => PendingState::InProgress,
        }
    }
}

impl Drop for PendingOperation {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

impl fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("is_done", &self.is_done())
            .field("completed", &self.completed)
            .finish()
    }
}

/// [`Transport`] backed by `reqwest`.
///
/// Any non-2xx status counts as a failed exchange.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client, e.g. one with custom TLS or proxy settings.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    fn issue(&self, request: OutgoingRequest) -> PendingOperation {
        let http = self.http.clone();
        PendingOperation::spawn(exchange(http, request))
    }
}

async fn exchange(http: reqwest::Client, request: OutgoingRequest) -> Completion {
    let mut builder = http.request(request.method, request.url);
    if let Some(body) = request.body {
        builder = builder
            .header(header::CONTENT_TYPE, body.content_type)
            .body(body.bytes);
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(err) => {
            return Completion::Failed {
                error: err.to_string(),
            }
        }
    };

    let status = response.status();
    match response.text().await {
        Ok(text) if status.is_success() => Completion::Succeeded { text },
        Ok(_) => Completion::Failed {
            error: status_error(status),
        },
        Err(err) => Completion::Failed {
            error: err.to_string(),
        },
    }
}

fn status_error(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP/1.1 {} {reason}", status.as_u16()),
        None => format!("HTTP/1.1 {}", status.as_u16()),
    }
}
