/// Error type used inside the orchestrator and the session helpers.
///
/// The three send operations never return it; it is logged and folded into
/// their failure contract instead.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// Endpoint text is not an absolute `http`/`https` URI.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    /// A send was issued before `initialize`.
    #[error("orchestrator is not initialized")]
    NotInitialized,
    /// The cancellation scope fired while an attempt was suspended.
    #[error("the operation was canceled")]
    Cancelled,
    /// Response payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}
