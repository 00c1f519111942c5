//! `gamelink-http` is the request layer of a game client.
//!
//! A [`RequestOrchestrator`] talks to one configured server endpoint through
//! three operations:
//! - [`RequestOrchestrator::send_read`]
//! - [`RequestOrchestrator::send_create`]
//! - [`RequestOrchestrator::send_update`]
//!
//! Each call bounds every attempt with a deadline, retries a bounded number
//! of times, honours a cancellation scope, and never returns an error:
//! failures are logged and reported through sentinel values.
//! [`GameSession`] layers the server's command vocabulary on top.

mod attempt;
mod endpoint;
mod error;
mod form;
mod options;
mod orchestrator;
pub mod session;
pub mod transport;
pub mod wire;

#[cfg(test)]
mod testing;

pub use endpoint::{resolve_endpoint, Endpoint};
pub use error::ConnectorError;
pub use form::FormFields;
pub use options::RetryPolicy;
pub use orchestrator::RequestOrchestrator;
pub use session::{GameSession, RequestMessage};
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpTransport, Transport};

pub type Result<T> = std::result::Result<T, ConnectorError>;
