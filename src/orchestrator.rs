use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::{
    attempt::{self, CallReport, OperationKind},
    transport::{HttpTransport, OutgoingRequest, PendingState, RequestBody, Transport},
    wire, ConnectorError, Endpoint, FormFields, Result, RetryPolicy,
};

/// Issues read, create and update requests against one server endpoint.
///
/// Every call runs up to [`RetryPolicy::max_attempts`] sequential attempts,
/// each bounded by the per-attempt deadline. Calls never fail: problems are
/// logged and folded into each operation's return contract.
pub struct RequestOrchestrator<T = HttpTransport> {
    transport: T,
    endpoint: Option<String>,
    policy: RetryPolicy,
    scope: CancellationToken,
}

impl<T> fmt::Debug for RequestOrchestrator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOrchestrator")
            .field("endpoint", &self.endpoint)
            .field("policy", &self.policy)
            .field("cancelled", &self.scope.is_cancelled())
            .finish()
    }
}

impl RequestOrchestrator<HttpTransport> {
    /// Creates an orchestrator backed by `reqwest`.
    pub fn http() -> Self {
        Self::new(HttpTransport::new())
    }

    /// Creates an initialized orchestrator from environment variables.
    ///
    /// Reads:
    /// - `GAMELINK_ENDPOINT` — server URL
    /// - `GAMELINK_MAX_RETRIES`, `GAMELINK_ATTEMPT_TIMEOUT_MS` — optional,
    ///   see [`RetryPolicy::from_env`]
    ///
    /// Returns an error if the endpoint is missing or empty. The endpoint is
    /// not validated here.
    pub fn from_env() -> std::result::Result<Self, String> {
        let endpoint = std::env::var("GAMELINK_ENDPOINT")
            .map_err(|_| "missing GAMELINK_ENDPOINT environment variable".to_owned())?;
        if endpoint.trim().is_empty() {
            return Err("GAMELINK_ENDPOINT is set but empty".to_owned());
        }
        let mut orchestrator = Self::http().with_policy(RetryPolicy::from_env()?);
        orchestrator.initialize(endpoint);
        Ok(orchestrator)
    }
}

impl<T: Transport> RequestOrchestrator<T> {
    /// Creates an uninitialized orchestrator over `transport`.
    ///
    /// Sends fail until [`RequestOrchestrator::initialize`] is called.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            endpoint: None,
            policy: RetryPolicy::default(),
            scope: CancellationToken::new(),
        }
    }

    /// Applies the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the target endpoint and starts a fresh cancellation scope.
    ///
    /// Calling it again replaces the configuration and cancels the previous
    /// scope, so tokens handed out by
    /// [`RequestOrchestrator::cancellation_scope`] before that report
    /// cancellation and no longer affect new calls.
    pub fn initialize(&mut self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        tracing::info!(endpoint = %endpoint, "orchestrator initialized");
        self.endpoint = Some(endpoint);
        self.scope.cancel();
        self.scope = CancellationToken::new();
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Handle to the instance cancellation scope. Cancelling it stops every
    /// call that was not given its own token.
    pub fn cancellation_scope(&self) -> CancellationToken {
        self.scope.clone()
    }

    /// Cancels the instance scope.
    pub fn shutdown(&mut self) {
        tracing::info!("orchestrator shutting down");
        self.scope.cancel();
    }

    /// Sends a body-less read.
    ///
    /// Returns `true` only when the exchange succeeded and the server answered
    /// exactly [`wire::READ_SUCCESS`].
    pub async fn send_read(&self, cancel: Option<&CancellationToken>) -> bool {
        match self.call(OperationKind::Read, None, cancel).await {
            Ok(report) => match transport_text(OperationKind::Read, report) {
                Some(text) => text == wire::READ_SUCCESS,
                None => false,
            },
            Err(err) => {
                tracing::error!(error = %err, "read request failed");
                false
            }
        }
    }

    /// Sends `fields` as a form.
    ///
    /// Returns the response text, [`wire::FAILURE`] when the exchange failed,
    /// or the error message when the call could not be carried out.
    pub async fn send_create(
        &self,
        fields: &FormFields,
        cancel: Option<&CancellationToken>,
    ) -> String {
        let body = RequestBody {
            content_type: wire::FORM_CONTENT_TYPE,
            bytes: wire::encode_form(fields),
        };
        self.send_text(OperationKind::Create, body, cancel).await
    }

    /// Sends `"{payload}^{operation_tag}"` as raw bytes.
    ///
    /// Same return contract as [`RequestOrchestrator::send_create`]. Unlike
    /// the other operations, cancellation stops waiting immediately and the
    /// unfinished exchange is reported as [`wire::FAILURE`].
    pub async fn send_update(
        &self,
        payload: &str,
        operation_tag: &str,
        cancel: Option<&CancellationToken>,
    ) -> String {
        let body = RequestBody {
            content_type: wire::UPDATE_CONTENT_TYPE,
            bytes: wire::encode_update(payload, operation_tag),
        };
        self.send_text(OperationKind::Update, body, cancel).await
    }

    async fn send_text(
        &self,
        kind: OperationKind,
        body: RequestBody,
        cancel: Option<&CancellationToken>,
    ) -> String {
        match self.call(kind, Some(body), cancel).await {
            Ok(report) => {
                transport_text(kind, report).unwrap_or_else(|| wire::FAILURE.to_owned())
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!(error = %message, ?kind, "request failed");
                message
            }
        }
    }

    async fn call(
        &self,
        kind: OperationKind,
        body: Option<RequestBody>,
        cancel: Option<&CancellationToken>,
    ) -> Result<CallReport> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(ConnectorError::NotInitialized)?;
        let endpoint = Endpoint::parse(endpoint)?;
        let request = OutgoingRequest {
            method: kind.method(),
            url: endpoint.as_url().clone(),
            body,
        };
        let cancel = cancel.unwrap_or(&self.scope);
        attempt::drive(&self.transport, &self.policy, &request, kind, cancel).await
    }
}

impl<T> Drop for RequestOrchestrator<T> {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

/// Response text of a successful exchange; `None` for anything else.
fn transport_text(kind: OperationKind, report: CallReport) -> Option<String> {
    match report.state {
        PendingState::Succeeded { text } => {
            tracing::info!(?kind, attempts = report.attempts, result = %text, "request result");
            Some(text)
        }
        PendingState::Failed { error } => {
            tracing::error!(?kind, attempts = report.attempts, error = %error, "request failed");
            None
        }
        PendingState::InProgress => {
            tracing::error!(?kind, attempts = report.attempts, "request did not finish");
            None
        }
    }
}
