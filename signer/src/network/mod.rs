//! Network-facing types: the connection capability the caller supplies and
//! the stream events it delivers.

pub mod connection;
pub mod events;

pub use connection::{
    request_with_timeout, server_error, ConnectionError, LedgerConnection, NetworkState,
};
pub use events::{LedgerClosed, StreamEvent, TransactionEvent};
