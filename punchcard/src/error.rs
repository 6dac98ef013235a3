//! High-level error types

use std::time::Duration;

use punchcard_core::Command;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket could not be opened or the handshake was rejected
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Device rejected the commkey password
    #[error("Authentication failed - invalid password")]
    Authentication,

    /// No reply within the per-read bound
    #[error("Timeout waiting for reply after {after:?}")]
    Timeout { after: Duration },

    /// Checksum or frame malformed
    #[error("Protocol error: {0}")]
    Protocol(#[from] punchcard_core::Error),

    /// Bulk transfer aborted before the announced length arrived
    #[error("Partial bulk transfer: expected {expected} bytes, received {received}")]
    PartialData { expected: usize, received: usize },

    /// Operation attempted without an established session
    #[error("Device not connected")]
    NotConnected,

    /// Device answered a request with a command we cannot act on
    #[error("Unexpected reply to {sent}: {got}")]
    UnexpectedReply { sent: Command, got: Command },

    /// Reply decoded but its payload is not what the command promises
    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),

    /// Store-side failure during sync
    #[error("Store error: {0}")]
    Store(String),
}

/// Map a transport failure onto the facade taxonomy
///
/// Read/connect timeouts become `Timeout`, everything else is a
/// connection-level failure.
pub(crate) fn map_transport(err: punchcard_transport::Error, after: Duration) -> Error {
    use punchcard_transport::Error as T;

    match err {
        T::ReadTimeout | T::ConnectionTimeout => Error::Timeout { after },
        T::NotConnected => Error::NotConnected,
        other => Error::Connection(other.to_string()),
    }
}
