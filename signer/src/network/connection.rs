//! The connection capability.
//!
//! The pipeline never opens sockets. It talks to the network through a
//! [`LedgerConnection`] the caller already holds, which is usually shared
//! with other work, and the caller keeps ownership of it.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

use super::events::StreamEvent;

/// Snapshot of the network values used to fill in omitted fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetworkState {
    /// Open-ledger fee in drops, as the server last reported it.
    pub fee_avg: u64,
    /// Index of the last closed ledger.
    pub ledger_last: u32,
}

/// Transport-level failures. A server answering with an error status is
/// *not* one of these; see [`LedgerConnection::request`].
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("connection closed")]
    Closed,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("server error {error}{}", .message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Server {
        error: String,
        message: Option<String>,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Request/response plus event stream over a live ledger connection.
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Send one command and wait for its response.
    ///
    /// `Ok` carries the response's `result` object. When the server
    /// answers with an error status, `Ok` carries the error payload
    /// (`error`, `error_message`, ...) so callers can inspect it; only
    /// transport failures are `Err`.
    async fn request(&self, request: Value) -> Result<Value, ConnectionError>;

    /// A fresh receiver for stream events. Events sent before this call are
    /// not replayed.
    fn events(&self) -> broadcast::Receiver<StreamEvent>;

    /// Current fee and ledger snapshot.
    fn state(&self) -> NetworkState;

    /// `true` when the connection is open and can take requests.
    fn is_ready(&self) -> bool;
}

/// `request`, bounded by an optional timeout.
pub async fn request_with_timeout<C>(
    connection: &C,
    request: Value,
    timeout: Option<Duration>,
) -> Result<Value, ConnectionError>
where
    C: LedgerConnection + ?Sized,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, connection.request(request))
            .await
            .map_err(|_| ConnectionError::Timeout(limit))?,
        None => connection.request(request).await,
    }
}

/// `Some` when a response is a server error payload.
pub fn server_error(response: &Value) -> Option<ConnectionError> {
    let error = response.get("error")?.as_str()?.to_string();
    let message = response
        .get("error_message")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(ConnectionError::Server { error, message })
}
